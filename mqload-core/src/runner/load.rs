use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::plan::{WorkerPlan, plan_workers};
use super::result::{RunResult, WorkerResult};
use super::signal::StopSignal;
use super::stats::RunStats;
use super::worker::{WorkerContext, WorkerOutcome, run_worker};
use crate::config::{BrokerConfig, LoadConfig};
use crate::error::Result;
use crate::publish::Connector;

/// Runs one worker task per plan entry and waits for all of them.
///
/// Returns only after every worker finished, so `total_sent + total_failed == total_messages`
/// unless `cancel` fired. A panicking worker fails its whole share; it never aborts the others.
pub async fn run_load(
    load: &LoadConfig,
    broker: &BrokerConfig,
    connector: Arc<dyn Connector>,
    stats: Arc<RunStats>,
    cancel: Arc<StopSignal>,
) -> Result<RunResult> {
    let plans = plan_workers(load)?;

    let base_instant = Instant::now();
    let base_wall = Utc::now();

    let ctx = WorkerContext {
        connector,
        load: Arc::new(load.clone()),
        broker: Arc::new(broker.clone()),
        stats,
        cancel: cancel.clone(),
    };

    info!(
        total_messages = load.total_messages,
        workers = load.workers,
        destinations = load.destinations,
        "starting load generation"
    );

    let mut handles: Vec<(WorkerPlan, tokio::task::JoinHandle<WorkerOutcome>)> =
        Vec::with_capacity(plans.len());
    for plan in plans {
        let ctx = ctx.clone();
        handles.push((plan, tokio::spawn(run_worker(plan, ctx))));
    }

    let mut outcomes: Vec<WorkerOutcome> = Vec::with_capacity(handles.len());
    for (plan, h) in handles {
        match h.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                warn!(worker_id = plan.worker_id, error = %err, "worker task failed");
                let now = Instant::now();
                outcomes.push(WorkerOutcome {
                    result: WorkerResult {
                        worker_id: plan.worker_id,
                        destination_id: plan.destination_id,
                        share: plan.share,
                        sent: 0,
                        failed: plan.share,
                        connect_error: None,
                    },
                    started: base_instant,
                    finished: now,
                    latencies_ms: Vec::new(),
                });
            }
        }
    }

    let result = assemble(load.total_messages, outcomes, base_instant, base_wall, &cancel);

    info!(
        sent = result.total_sent,
        failed = result.total_failed,
        duration_secs = result.duration.as_secs_f64(),
        throughput = result.throughput,
        cancelled = result.cancelled,
        "load generation finished"
    );

    Ok(result)
}

fn assemble(
    total_messages: u64,
    outcomes: Vec<WorkerOutcome>,
    base_instant: Instant,
    base_wall: DateTime<Utc>,
    cancel: &StopSignal,
) -> RunResult {
    let started = outcomes
        .iter()
        .map(|o| o.started)
        .min()
        .unwrap_or(base_instant);
    let finished = outcomes
        .iter()
        .map(|o| o.finished)
        .max()
        .unwrap_or(started);
    let duration = finished.saturating_duration_since(started);

    let mut workers = Vec::with_capacity(outcomes.len());
    let mut publish_latencies_ms = Vec::new();
    for o in outcomes {
        publish_latencies_ms.extend(o.latencies_ms);
        workers.push(o.result);
    }
    workers.sort_by_key(|w| w.worker_id);

    let total_sent: u64 = workers.iter().map(|w| w.sent).sum();
    let total_failed: u64 = workers.iter().map(|w| w.failed).sum();
    let throughput = if duration.is_zero() {
        0.0
    } else {
        total_sent as f64 / duration.as_secs_f64()
    };

    RunResult {
        total_messages,
        total_sent,
        total_failed,
        workers,
        started_at: wall_clock(base_wall, started.saturating_duration_since(base_instant)),
        finished_at: wall_clock(base_wall, finished.saturating_duration_since(base_instant)),
        duration,
        throughput,
        cancelled: cancel.is_stopped(),
        publish_latencies_ms,
    }
}

fn wall_clock(base: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(offset)
        .ok()
        .and_then(|d| base.checked_add_signed(d))
        .unwrap_or(base)
}
