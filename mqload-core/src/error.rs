use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`messages` must be a positive integer")]
    InvalidTotalMessages,

    #[error("`workers` must be a positive integer")]
    InvalidWorkers,

    #[error("`destinations` must be a positive integer")]
    InvalidDestinations,

    #[error("`userPool` must be a positive integer")]
    InvalidUserPool,

    #[error("`messageType` must not be empty")]
    InvalidMessageType,

    #[error("invalid broker url `{0}` (expected amqp://, amqps:// or discard://)")]
    InvalidBrokerUrl(String),

    #[error("`exchange` must not be empty")]
    InvalidExchange,

    #[error("`pollInterval` must be a positive duration")]
    InvalidPollInterval,

    #[error("`pollTimeout` must be a positive duration")]
    InvalidPollTimeout,

    #[error("`bucketWidth` must be a positive duration")]
    InvalidBucketWidth,

    #[error("`progressInterval` must be a positive duration")]
    InvalidProgressInterval,

    #[error("invalid duration `{0}` (expected e.g. 10s, 250ms, 5m)")]
    InvalidDuration(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid latency sample `{value}` on line {line}")]
    InvalidLatencySample { line: usize, value: String },
}

impl Error {
    /// Configuration errors abort a run before any connection is opened.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidTotalMessages
                | Self::InvalidWorkers
                | Self::InvalidDestinations
                | Self::InvalidUserPool
                | Self::InvalidMessageType
                | Self::InvalidBrokerUrl(_)
                | Self::InvalidExchange
                | Self::InvalidPollInterval
                | Self::InvalidPollTimeout
                | Self::InvalidBucketWidth
                | Self::InvalidProgressInterval
                | Self::InvalidDuration(_)
        )
    }
}

/// A worker could not establish its broker connection.
#[derive(Debug, Clone, thiserror::Error)]
#[error("connect failed: {0}")]
pub struct ConnectError(pub String);

/// A single publish was rejected or could not be delivered to the broker.
#[derive(Debug, Clone, thiserror::Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("invalid metrics url: {0}")]
    InvalidUrl(String),

    #[error("only http:// metrics urls are supported: {0}")]
    OnlyHttpSupported(String),

    #[error("metrics request failed: {0}")]
    Http(#[from] crate::http::Error),

    #[error("metrics endpoint returned status {0}")]
    Status(u16),

    #[error("metrics payload is not valid json: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("metrics request timed out after {0:?}")]
    Timeout(Duration),
}
