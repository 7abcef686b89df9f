mod load;
mod plan;
mod progress;
mod result;
mod signal;
mod stats;
mod worker;

pub use load::run_load;
pub use plan::{WorkerPlan, plan_workers};
pub(crate) use progress::{ProgressTicker, TickerConfig};
pub use progress::{CounterSample, ProgressFn, ProgressUpdate};
pub use result::{RunResult, WorkerResult};
pub use signal::StopSignal;
pub use stats::{LatencyWindowMs, RateSummary, RunStats};
