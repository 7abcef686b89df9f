use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one worker's share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    pub worker_id: u64,
    pub destination_id: u64,
    pub share: u64,
    pub sent: u64,
    pub failed: u64,
    /// Set when the worker could not open its broker session; the whole share counts as failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_error: Option<String>,
}

impl WorkerResult {
    /// Messages neither sent nor failed. Non-zero only for cancelled runs.
    pub fn unsent(&self) -> u64 {
        self.share.saturating_sub(self.sent + self.failed)
    }
}

/// Aggregate outcome of the load generation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub total_messages: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub workers: Vec<WorkerResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "crate::serde_duration::secs")]
    pub duration: Duration,
    /// `total_sent / duration`; 0 when the duration is zero.
    pub throughput: f64,
    pub cancelled: bool,
    /// Per-message publish latencies in milliseconds, in completion order per worker.
    #[serde(skip)]
    pub publish_latencies_ms: Vec<f64>,
}

impl RunResult {
    pub fn unsent(&self) -> u64 {
        self.total_messages
            .saturating_sub(self.total_sent + self.total_failed)
    }
}
