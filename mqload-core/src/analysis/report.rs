use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::bucket::IntervalBucket;
use super::latency::{LatencySummary, summarize_latencies};
use super::stability::{StabilitySection, stability_section};
use crate::config::MetricsSchema;
use crate::monitor::MetricsSnapshot;

#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub buckets: &'a [IntervalBucket],
    pub latencies_ms: &'a [f64],
    pub snapshots: &'a [MetricsSnapshot],
    /// Wall-clock length of the run. Falls back to the bucket span when absent.
    pub elapsed: Option<Duration>,
    pub schema: &'a MetricsSchema,
    pub pool_capacity: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRate {
    pub start_secs: f64,
    pub end_secs: f64,
    pub count: u64,
    pub rate: f64,
}

impl From<&IntervalBucket> for BucketRate {
    fn from(b: &IntervalBucket) -> Self {
        Self {
            start_secs: b.start_secs,
            end_secs: b.end_secs,
            count: b.count,
            rate: b.rate(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputSummary {
    pub buckets: Vec<BucketRate>,
    pub total_count: u64,
    /// Mean of the per-bucket rates.
    pub mean_rate: Option<f64>,
    /// First bucket with the highest rate.
    pub peak: Option<BucketRate>,
    /// First bucket with the lowest rate.
    pub min: Option<BucketRate>,
    /// `total_count / elapsed`.
    pub average_throughput: Option<f64>,
}

/// Everything derived from one run. `None` fields mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub throughput: ThroughputSummary,
    pub latency: Option<LatencySummary>,
    pub stability: StabilitySection,
}

/// Pure and deterministic: the same input always yields the same report.
pub fn analyze(input: &AnalysisInput<'_>) -> AnalysisReport {
    AnalysisReport {
        throughput: throughput_summary(input.buckets, input.elapsed),
        latency: summarize_latencies(input.latencies_ms),
        stability: stability_section(input.snapshots, input.schema, input.pool_capacity),
    }
}

fn throughput_summary(buckets: &[IntervalBucket], elapsed: Option<Duration>) -> ThroughputSummary {
    let rates: Vec<BucketRate> = buckets.iter().map(BucketRate::from).collect();
    let total_count: u64 = buckets.iter().map(|b| b.count).sum();

    let mean_rate = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().map(|r| r.rate).sum::<f64>() / rates.len() as f64)
    };

    let mut peak: Option<BucketRate> = None;
    let mut min: Option<BucketRate> = None;
    for r in &rates {
        if peak.is_none_or(|p| r.rate > p.rate) {
            peak = Some(*r);
        }
        if min.is_none_or(|m| r.rate < m.rate) {
            min = Some(*r);
        }
    }

    let span_secs = match elapsed {
        Some(d) => d.as_secs_f64(),
        None => match (buckets.first(), buckets.last()) {
            (Some(first), Some(last)) => last.end_secs - first.start_secs,
            _ => 0.0,
        },
    };
    let average_throughput = (span_secs > 0.0).then(|| total_count as f64 / span_secs);

    ThroughputSummary {
        buckets: rates,
        total_count,
        mean_rate,
        peak,
        min,
        average_throughput,
    }
}
