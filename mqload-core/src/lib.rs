mod http;
mod serde_duration;

#[cfg(feature = "amqp")]
mod amqp;

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod message;
pub mod monitor;
pub mod orchestrator;
pub mod publish;
pub mod runner;

#[cfg(feature = "amqp")]
pub use amqp::AmqpConnector;
pub use analysis::{AnalysisReport, IntervalBucket, analyze};
pub use config::{RunConfig, RunOptions, config_from_options};
pub use error::{ConnectError, Error, PollError, PublishError, Result};
pub use monitor::{MetricsPoller, MetricsSnapshot, MetricsSource};
pub use orchestrator::{RunDeps, RunOutcome, analyze_outcome, execute_run};
pub use publish::{Connector, DiscardConnector, Publisher, connector_for};
pub use runner::{ProgressFn, ProgressUpdate, RunResult, StopSignal, WorkerResult, run_load};
