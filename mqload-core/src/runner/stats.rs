use hdrhistogram::Histogram;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by every worker of a run and read by the progress ticker.
#[derive(Debug)]
pub struct RunStats {
    sent_total: AtomicU64,
    failed_total: AtomicU64,
    active_workers: AtomicU64,
    latency_us_window: Mutex<Histogram<u64>>,
    rate_samples: Mutex<RateAgg>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyWindowMs {
    pub p50_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateSummary {
    pub avg: f64,
    pub stdev: f64,
    pub max: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct RateAgg {
    count: u64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RateAgg {
    fn record(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        self.count = self.count.saturating_add(1);
        let delta = sample - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
        self.max = self.max.max(sample);
    }

    fn summary(&self) -> RateSummary {
        if self.count == 0 {
            return RateSummary::default();
        }

        let stdev = if self.count >= 2 {
            (self.m2 / ((self.count - 1) as f64)).sqrt()
        } else {
            0.0
        };

        RateSummary {
            avg: self.mean,
            stdev,
            max: self.max,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        fn new_hist() -> Histogram<u64> {
            // Up to 60s in microseconds, 3 sigfigs.
            Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
                .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
        }

        Self {
            sent_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
            latency_us_window: Mutex::new(new_hist()),
            rate_samples: Mutex::new(RateAgg::default()),
        }
    }
}

impl RunStats {
    pub fn sent_total(&self) -> u64 {
        self.sent_total.load(Ordering::Relaxed)
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> u64 {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Messages that reached a final outcome (sent or failed).
    pub fn completed_total(&self) -> u64 {
        self.sent_total().saturating_add(self.failed_total())
    }

    pub fn record_sent(&self, elapsed: Duration) {
        self.sent_total.fetch_add(1, Ordering::Relaxed);
        self.record_latency(elapsed);
    }

    pub fn record_failed(&self) {
        self.failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker that never connected fails its whole share at once.
    pub fn record_connect_failure(&self, share: u64) {
        self.failed_total.fetch_add(share, Ordering::Relaxed);
    }

    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) {
        let _ = self
            .active_workers
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    pub fn record_rate_sample(&self, rate_now: f64) {
        self.rate_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(rate_now);
    }

    pub fn rate_summary(&self) -> RateSummary {
        self.rate_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .summary()
    }

    fn record_latency(&self, elapsed: Duration) {
        let us = elapsed.as_micros();
        if us == 0 {
            return;
        }
        let value = u64::try_from(us).unwrap_or(u64::MAX);

        let mut h = self
            .latency_us_window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = h.record(value);
    }

    /// Latency percentiles since the previous call; resets the window.
    pub fn take_latency_window_ms(&self) -> LatencyWindowMs {
        let mut h = self
            .latency_us_window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        let out = if h.len() == 0 {
            LatencyWindowMs::default()
        } else {
            LatencyWindowMs {
                p50_ms: Some(h.value_at_quantile(0.50) as f64 / 1000.0),
                p99_ms: Some(h.value_at_quantile(0.99) as f64 / 1000.0),
            }
        };

        h.reset();
        out
    }
}
