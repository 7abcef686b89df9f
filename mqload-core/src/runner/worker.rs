use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::plan::WorkerPlan;
use super::result::WorkerResult;
use super::signal::StopSignal;
use super::stats::RunStats;
use crate::config::{BrokerConfig, LoadConfig};
use crate::message::{CONTENT_TYPE_JSON, MessageFactory};
use crate::publish::{Connector, PublishRequest};

const SENT_LOG_EVERY: u64 = 1000;
const FAILED_LOG_EVERY: u64 = 100;

#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub connector: Arc<dyn Connector>,
    pub load: Arc<LoadConfig>,
    pub broker: Arc<BrokerConfig>,
    pub stats: Arc<RunStats>,
    pub cancel: Arc<StopSignal>,
}

pub(crate) struct WorkerOutcome {
    pub result: WorkerResult,
    pub started: Instant,
    pub finished: Instant,
    pub latencies_ms: Vec<f64>,
}

/// Publishes one worker's share sequentially over its own broker session.
///
/// A failed publish is counted and the worker moves on. A failed connect fails the whole share.
/// The stop signal is checked before each message; on cancellation the remainder stays unsent.
pub(crate) async fn run_worker(plan: WorkerPlan, ctx: WorkerContext) -> WorkerOutcome {
    let started = Instant::now();
    let mut result = WorkerResult {
        worker_id: plan.worker_id,
        destination_id: plan.destination_id,
        share: plan.share,
        sent: 0,
        failed: 0,
        connect_error: None,
    };
    let mut latencies_ms: Vec<f64> = Vec::new();

    if plan.share == 0 {
        return WorkerOutcome {
            result,
            started,
            finished: Instant::now(),
            latencies_ms,
        };
    }

    let mut publisher = match ctx.connector.connect(plan.worker_id).await {
        Ok(p) => p,
        Err(err) => {
            warn!(worker_id = plan.worker_id, error = %err, "worker failed to connect");
            ctx.stats.record_connect_failure(plan.share);
            result.failed = plan.share;
            result.connect_error = Some(err.to_string());
            return WorkerOutcome {
                result,
                started,
                finished: Instant::now(),
                latencies_ms,
            };
        }
    };

    ctx.stats.worker_started();
    if ctx.load.collect_latencies {
        latencies_ms.reserve(usize::try_from(plan.share).unwrap_or(0).min(1 << 20));
    }

    let factory = MessageFactory::new(
        plan.destination_id,
        plan.worker_id,
        ctx.load.user_pool,
        ctx.load.message_type.clone(),
    );
    let routing_key = ctx.broker.routing_key(plan.destination_id);

    for seq in 0..plan.share {
        if ctx.cancel.is_stopped() {
            info!(
                worker_id = plan.worker_id,
                sent = result.sent,
                failed = result.failed,
                "worker stopped early"
            );
            break;
        }

        let body = match serde_json::to_vec(&factory.build(seq)) {
            Ok(b) => Bytes::from(b),
            Err(err) => {
                warn!(worker_id = plan.worker_id, seq, error = %err, "failed to encode message");
                result.failed += 1;
                ctx.stats.record_failed();
                continue;
            }
        };

        let req = PublishRequest {
            destination_id: plan.destination_id,
            routing_key: routing_key.clone(),
            body,
            content_type: CONTENT_TYPE_JSON,
            persistent: ctx.load.persistent,
        };

        let t0 = Instant::now();
        match publisher.publish(req).await {
            Ok(()) => {
                let elapsed = t0.elapsed();
                result.sent += 1;
                ctx.stats.record_sent(elapsed);
                if ctx.load.collect_latencies {
                    latencies_ms.push(elapsed.as_secs_f64() * 1000.0);
                }
                if result.sent % SENT_LOG_EVERY == 0 {
                    debug!(
                        worker_id = plan.worker_id,
                        sent = result.sent,
                        share = plan.share,
                        "worker progress"
                    );
                }
            }
            Err(err) => {
                result.failed += 1;
                ctx.stats.record_failed();
                if warns_on_failure(result.failed) {
                    warn!(
                        worker_id = plan.worker_id,
                        failed = result.failed,
                        error = %err,
                        "publish failed"
                    );
                }
            }
        }
    }

    publisher.close().await;
    ctx.stats.worker_finished();

    WorkerOutcome {
        result,
        started,
        finished: Instant::now(),
        latencies_ms,
    }
}

/// The first failure of a worker and every 100th after it are logged.
fn warns_on_failure(failed: u64) -> bool {
    failed % FAILED_LOG_EVERY == 1
}
