use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::snapshot::{MetricsSnapshot, SnapshotPayload};
use super::source::MetricsSource;
use crate::config::{MetricsSchema, MonitorConfig};
use crate::error::{Error, Result};
use crate::runner::StopSignal;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Take one more snapshot after the stop signal, closing the log at stop time.
    pub final_poll: bool,
    pub schema: MetricsSchema,
}

impl From<&MonitorConfig> for PollerConfig {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            interval: cfg.interval,
            timeout: cfg.timeout,
            final_poll: cfg.final_poll,
            schema: cfg.schema.clone(),
        }
    }
}

pub struct MetricsPoller;

pub struct PollerHandle {
    stop: Arc<StopSignal>,
    handle: JoinHandle<Vec<MetricsSnapshot>>,
}

impl MetricsPoller {
    /// Starts polling on its own task. The first poll happens right away and serves as the
    /// pre-load baseline. The task owns the snapshot log and hands it back on join.
    pub fn spawn(
        source: Arc<dyn MetricsSource>,
        cfg: PollerConfig,
        run_started: Instant,
        stop: Arc<StopSignal>,
    ) -> PollerHandle {
        let stop_rx = stop.clone();
        let handle = tokio::spawn(poll_loop(source, cfg, run_started, stop_rx));
        PollerHandle { stop, handle }
    }
}

impl PollerHandle {
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        self.stop.clone()
    }

    /// Signals stop and waits for the poller task. No snapshot is appended after this returns.
    pub async fn stop_and_collect(self) -> Result<Vec<MetricsSnapshot>> {
        self.stop.stop();
        self.handle.await.map_err(Error::from)
    }
}

async fn poll_loop(
    source: Arc<dyn MetricsSource>,
    cfg: PollerConfig,
    run_started: Instant,
    stop: Arc<StopSignal>,
) -> Vec<MetricsSnapshot> {
    let mut interval = tokio::time::interval(cfg.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut log: Vec<MetricsSnapshot> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.wait() => break,
            _ = interval.tick() => {}
        }

        tokio::select! {
            biased;
            _ = stop.wait() => break,
            snapshot = poll_once(source.as_ref(), &cfg, run_started) => {
                append(&mut log, snapshot, &cfg.schema);
            }
        }
    }

    if cfg.final_poll {
        let snapshot = poll_once(source.as_ref(), &cfg, run_started).await;
        append(&mut log, snapshot, &cfg.schema);
    }

    info!(snapshots = log.len(), "metrics poller stopped");
    log
}

async fn poll_once(
    source: &dyn MetricsSource,
    cfg: &PollerConfig,
    run_started: Instant,
) -> MetricsSnapshot {
    let res = source.fetch(cfg.timeout).await;
    let elapsed = run_started.elapsed();
    let timestamp = Utc::now();

    match res {
        Ok(data) => MetricsSnapshot::available(timestamp, elapsed, data),
        Err(err) => MetricsSnapshot::unavailable(timestamp, elapsed, err.to_string()),
    }
}

fn append(log: &mut Vec<MetricsSnapshot>, snapshot: MetricsSnapshot, schema: &MetricsSchema) {
    if log.last().is_some_and(|last| snapshot.elapsed <= last.elapsed) {
        return;
    }

    match &snapshot.payload {
        SnapshotPayload::Available { .. } => {
            let pool = snapshot.pool_gauges(schema);
            info!(
                elapsed_secs = snapshot.elapsed.as_secs_f64(),
                total_messages = snapshot.cumulative_count(schema),
                pool_active = pool.map(|p| p.active),
                pool_total = pool.map(|p| p.total),
                "metrics snapshot"
            );
        }
        SnapshotPayload::Unavailable { reason } => {
            warn!(
                elapsed_secs = snapshot.elapsed.as_secs_f64(),
                reason = %reason,
                "metrics unavailable"
            );
        }
    }

    log.push(snapshot);
}
