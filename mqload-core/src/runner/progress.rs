use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::signal::StopSignal;
use super::stats::RunStats;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based).
    pub tick: u64,
    pub elapsed: Duration,
    pub total_messages: u64,
    pub sent_total: u64,
    pub failed_total: u64,
    pub active_workers: u64,
    /// Messages/sec acknowledged during the last interval.
    pub rate_now: f64,
    pub rate_avg: f64,
    pub rate_max: f64,
    pub latency_p50_ms_now: Option<f64>,
    pub latency_p99_ms_now: Option<f64>,
    /// Operator's expected run length, if given. Display only.
    pub duration_hint: Option<Duration>,
}

impl ProgressUpdate {
    /// Fraction of the planned volume that reached a final outcome, in `0..=1`.
    pub fn completion(&self) -> f64 {
        if self.total_messages == 0 {
            return 1.0;
        }
        ((self.sent_total + self.failed_total) as f64 / self.total_messages as f64).min(1.0)
    }
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

/// Cumulative sent count at a point in the run. The throughput buckets are derived from these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSample {
    #[serde(with = "crate::serde_duration::secs")]
    pub elapsed: Duration,
    pub total: u64,
}

pub(crate) struct ProgressTicker {
    stop: Arc<StopSignal>,
    handle: JoinHandle<Vec<CounterSample>>,
}

pub(crate) struct TickerConfig {
    pub interval: Duration,
    pub total_messages: u64,
    pub duration_hint: Option<Duration>,
}

impl ProgressTicker {
    /// Samples the shared counters every `interval` until stopped. The origin sample is taken
    /// before this returns.
    pub(crate) fn spawn(
        stats: Arc<RunStats>,
        started: Instant,
        cfg: TickerConfig,
        progress: Option<ProgressFn>,
    ) -> Self {
        let stop = Arc::new(StopSignal::new());
        let stop_rx = stop.clone();
        let origin = CounterSample {
            elapsed: started.elapsed(),
            total: stats.sent_total(),
        };

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cfg.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut samples: Vec<CounterSample> = vec![origin];
            let mut tick_id: u64 = 0;
            let mut last_at = started;
            let mut last_sent = origin.total;

            loop {
                tokio::select! {
                    _ = stop_rx.wait() => break,
                    _ = interval.tick() => {}
                }

                tick_id = tick_id.saturating_add(1);
                if tick_id == 1 {
                    // `interval` fires immediately; the origin sample already covers it.
                    continue;
                }

                let now = Instant::now();
                let dt = now.duration_since(last_at);
                last_at = now;

                let sent_total = stats.sent_total();
                let delta = sent_total.saturating_sub(last_sent);
                last_sent = sent_total;

                push_sample(&mut samples, now.duration_since(started), sent_total);

                let rate_now = (delta as f64) / dt.as_secs_f64().max(1e-9);
                stats.record_rate_sample(rate_now);

                if let Some(progress) = &progress {
                    let rate = stats.rate_summary();
                    let window = stats.take_latency_window_ms();
                    (progress)(ProgressUpdate {
                        tick: tick_id - 1,
                        elapsed: now.duration_since(started),
                        total_messages: cfg.total_messages,
                        sent_total,
                        failed_total: stats.failed_total(),
                        active_workers: stats.active_workers(),
                        rate_now,
                        rate_avg: rate.avg,
                        rate_max: rate.max,
                        latency_p50_ms_now: window.p50_ms,
                        latency_p99_ms_now: window.p99_ms,
                        duration_hint: cfg.duration_hint,
                    });
                }
            }

            push_sample(&mut samples, started.elapsed(), stats.sent_total());
            samples
        });

        Self { stop, handle }
    }

    /// Stops ticking and returns the counter series, closed by a final sample.
    pub(crate) async fn finish(self) -> Vec<CounterSample> {
        self.stop.stop();
        self.handle.await.unwrap_or_default()
    }
}

fn push_sample(samples: &mut Vec<CounterSample>, elapsed: Duration, total: u64) {
    match samples.last_mut() {
        Some(last) if elapsed <= last.elapsed => last.total = last.total.max(total),
        _ => samples.push(CounterSample { elapsed, total }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn ticker_reports_progress_and_closes_series() {
        let stats = Arc::new(RunStats::default());
        let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let progress: ProgressFn = Arc::new(move |u| {
            sink.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(u)
        });

        let ticker = ProgressTicker::spawn(
            stats.clone(),
            Instant::now(),
            TickerConfig {
                interval: Duration::from_millis(20),
                total_messages: 10,
                duration_hint: None,
            },
            Some(progress),
        );

        for _ in 0..10 {
            stats.record_sent(Duration::from_micros(50));
        }
        tokio::time::sleep(Duration::from_millis(70)).await;
        let samples = ticker.finish().await;

        assert!(samples.len() >= 2);
        assert_eq!(samples.first().map(|s| s.total), Some(0));
        assert_eq!(samples.last().map(|s| s.total), Some(10));
        assert!(samples.windows(2).all(|w| w[0].elapsed < w[1].elapsed));

        let updates = updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        assert!(!updates.is_empty());
        assert_eq!(updates[0].tick, 1);
        assert!(updates.iter().any(|u| (u.completion() - 1.0).abs() < 1e-9));
    }
}
