#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed. Individual publish failures do not change this.
    Success = 0,

    /// Invalid CLI/config/options (bad flags, invalid durations, unreadable config file, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, task join failures).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
