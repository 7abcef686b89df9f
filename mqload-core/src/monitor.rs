mod poller;
mod snapshot;
mod source;

pub use poller::{MetricsPoller, PollerConfig, PollerHandle};
pub use snapshot::{MetricsSnapshot, PoolGauges, SnapshotPayload};
pub use source::{HttpMetricsSource, MetricsSource};
