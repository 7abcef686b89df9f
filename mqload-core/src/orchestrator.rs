use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisInput, AnalysisReport, IntervalBucket, analyze, bucket_cumulative, bucket_uniform,
};
use crate::config::{MetricsSchema, RunConfig};
use crate::error::Result;
use crate::monitor::{
    HttpMetricsSource, MetricsPoller, MetricsSnapshot, MetricsSource, PollerConfig, PollerHandle,
};
use crate::publish::{Connector, connector_for};
use crate::runner::{
    CounterSample, ProgressFn, ProgressTicker, RunResult, RunStats, StopSignal, TickerConfig,
    run_load,
};

/// Collaborators of a run. Tests swap in fakes; [`RunDeps::from_config`] builds the real ones.
pub struct RunDeps {
    pub connector: Arc<dyn Connector>,
    pub metrics_source: Option<Arc<dyn MetricsSource>>,
    pub progress: Option<ProgressFn>,
    /// External interrupt. Stops the poller right away and makes workers exit after their
    /// current publish.
    pub cancel: Arc<StopSignal>,
}

impl RunDeps {
    /// A broken metrics URL is logged and monitoring is skipped; the run still happens.
    pub fn from_config(cfg: &RunConfig) -> Result<Self> {
        let connector = connector_for(&cfg.broker)?;

        let metrics_source = cfg.monitor.as_ref().and_then(|m| {
            match HttpMetricsSource::new(m.url.clone()) {
                Ok(src) => Some(Arc::new(src) as Arc<dyn MetricsSource>),
                Err(err) => {
                    warn!(url = %m.url, error = %err, "metrics monitoring disabled");
                    None
                }
            }
        });

        Ok(Self {
            connector,
            metrics_source,
            progress: None,
            cancel: Arc::new(StopSignal::new()),
        })
    }
}

/// Everything a run produced. The snapshot log is final: its writer has terminated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run: RunResult,
    pub snapshots: Vec<MetricsSnapshot>,
    pub throughput_samples: Vec<CounterSample>,
}

/// Poller first (baseline), then load; after load, an optional drain, then the poller is
/// stopped and joined.
pub async fn execute_run(cfg: &RunConfig, deps: RunDeps) -> Result<RunOutcome> {
    cfg.validate()?;

    let run_started = Instant::now();
    let cancel = deps.cancel;

    let poller = match (&cfg.monitor, deps.metrics_source) {
        (Some(monitor), Some(source)) => {
            info!(url = %monitor.url, interval = ?monitor.interval, "starting metrics poller");
            Some(MetricsPoller::spawn(
                source,
                PollerConfig::from(monitor),
                run_started,
                Arc::new(StopSignal::new()),
            ))
        }
        _ => None,
    };

    let interrupt = poller.as_ref().map(|p| {
        let poller_stop = p.stop_signal();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.wait().await;
            poller_stop.stop();
        })
    });

    let stats = Arc::new(RunStats::default());
    let ticker = ProgressTicker::spawn(
        stats.clone(),
        run_started,
        TickerConfig {
            interval: cfg.progress_interval,
            total_messages: cfg.load.total_messages,
            duration_hint: cfg.duration_hint,
        },
        deps.progress,
    );

    let loaded = run_load(
        &cfg.load,
        &cfg.broker,
        deps.connector,
        stats,
        cancel.clone(),
    )
    .await;

    let throughput_samples = ticker.finish().await;

    let run = match loaded {
        Ok(run) => run,
        Err(err) => {
            let _ = settle_poller(poller, interrupt).await;
            return Err(err);
        }
    };

    if poller.is_some() && !cfg.drain.is_zero() && !cancel.is_stopped() {
        info!(drain = ?cfg.drain, "waiting for consumers to drain");
        tokio::select! {
            _ = tokio::time::sleep(cfg.drain) => {}
            _ = cancel.wait() => info!("drain interrupted"),
        }
    }

    let snapshots = settle_poller(poller, interrupt).await?;

    Ok(RunOutcome {
        run,
        snapshots,
        throughput_samples,
    })
}

async fn settle_poller(
    poller: Option<PollerHandle>,
    interrupt: Option<tokio::task::JoinHandle<()>>,
) -> Result<Vec<MetricsSnapshot>> {
    if let Some(h) = interrupt {
        h.abort();
    }
    match poller {
        Some(p) => p.stop_and_collect().await,
        None => Ok(Vec::new()),
    }
}

/// Throughput buckets for a finished run: from the sampled counter when there is a series,
/// otherwise spread evenly over the run duration.
pub fn throughput_buckets(outcome: &RunOutcome, cfg: &RunConfig) -> Vec<IntervalBucket> {
    let width = cfg.analysis.bucket_width;
    let buckets = bucket_cumulative(&outcome.throughput_samples, width);
    if buckets.iter().map(|b| b.count).sum::<u64>() == outcome.run.total_sent {
        buckets
    } else {
        bucket_uniform(outcome.run.total_sent, outcome.run.duration, width)
    }
}

/// Runs the analyzer over a finished run. `external_latencies` (e.g. producer-to-commit
/// delays measured downstream) replace the publish latencies when given.
pub fn analyze_outcome(
    outcome: &RunOutcome,
    cfg: &RunConfig,
    external_latencies: Option<&[f64]>,
) -> AnalysisReport {
    let buckets = throughput_buckets(outcome, cfg);
    let default_schema = MetricsSchema::default();
    let schema = cfg
        .monitor
        .as_ref()
        .map(|m| &m.schema)
        .unwrap_or(&default_schema);

    analyze(&AnalysisInput {
        buckets: &buckets,
        latencies_ms: external_latencies.unwrap_or(&outcome.run.publish_latencies_ms),
        snapshots: &outcome.snapshots,
        elapsed: Some(outcome.run.duration),
        schema,
        pool_capacity: cfg.analysis.pool_capacity,
    })
}
