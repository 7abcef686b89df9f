use std::time::Duration;

use chrono::Utc;
use mqload_core::analysis::{
    AnalysisInput, IntervalBucket, analyze, bucket_uniform, summarize_latencies,
};
use mqload_core::config::MetricsSchema;
use mqload_core::monitor::MetricsSnapshot;
use serde_json::json;

fn bucket(start: f64, end: f64, count: u64) -> IntervalBucket {
    IntervalBucket {
        start_secs: start,
        end_secs: end,
        count,
    }
}

fn counted(secs: u64, total: u64) -> MetricsSnapshot {
    MetricsSnapshot::available(
        Utc::now(),
        Duration::from_secs(secs),
        json!({
            "coreQueries": { "totalMessages": total },
            "connectionPool": { "active": 2, "idle": 8, "total": 10 },
        }),
    )
}

#[test]
fn latency_percentiles_of_five_samples() {
    let summary = summarize_latencies(&[50.0, 10.0, 40.0, 20.0, 30.0])
        .unwrap_or_else(|| panic!("five samples give a summary"));

    assert_eq!(summary.count, 5);
    assert_eq!(summary.p50, 30.0);
    assert_eq!(summary.min, 10.0);
    assert_eq!(summary.max, 50.0);
    assert_eq!(summary.mean, 30.0);
    assert!((summary.stdev - 250.0f64.sqrt()).abs() < 1e-9);
}

#[test]
fn peak_and_minimum_intervals() {
    let buckets = [
        bucket(0.0, 10.0, 100),
        bucket(10.0, 20.0, 150),
        bucket(20.0, 30.0, 0),
    ];
    let schema = MetricsSchema::default();
    let report = analyze(&AnalysisInput {
        buckets: &buckets,
        latencies_ms: &[],
        snapshots: &[],
        elapsed: None,
        schema: &schema,
        pool_capacity: None,
    });

    let t = &report.throughput;
    assert_eq!(t.total_count, 250);

    let peak = t.peak.unwrap_or_else(|| panic!("peak expected"));
    assert_eq!((peak.start_secs, peak.end_secs), (10.0, 20.0));
    assert_eq!(peak.rate, 15.0);

    let min = t.min.unwrap_or_else(|| panic!("min expected"));
    assert_eq!((min.start_secs, min.end_secs), (20.0, 30.0));
    assert_eq!(min.rate, 0.0);

    let avg = t
        .average_throughput
        .unwrap_or_else(|| panic!("average expected"));
    assert!((avg - 250.0 / 30.0).abs() < 1e-9);
    assert_eq!(t.mean_rate, Some(25.0 / 3.0));
}

#[test]
fn ties_resolve_to_the_earliest_interval() {
    let buckets = [
        bucket(0.0, 1.0, 5),
        bucket(1.0, 2.0, 5),
        bucket(2.0, 3.0, 5),
    ];
    let schema = MetricsSchema::default();
    let report = analyze(&AnalysisInput {
        buckets: &buckets,
        latencies_ms: &[],
        snapshots: &[],
        elapsed: None,
        schema: &schema,
        pool_capacity: None,
    });

    assert_eq!(report.throughput.peak.map(|b| b.start_secs), Some(0.0));
    assert_eq!(report.throughput.min.map(|b| b.start_secs), Some(0.0));
}

#[test]
fn percentiles_never_decrease() {
    let samples: Vec<f64> = (0..997).map(|i| ((i * 7919) % 1000) as f64 / 3.0).collect();
    let s = summarize_latencies(&samples).unwrap_or_else(|| panic!("summary expected"));

    assert!(s.min <= s.p50);
    assert!(s.p50 <= s.p95);
    assert!(s.p95 <= s.p99);
    assert!(s.p99 <= s.max);
}

#[test]
fn tiny_and_empty_latency_sets() {
    assert!(summarize_latencies(&[]).is_none());
    assert!(summarize_latencies(&[f64::NAN]).is_none());

    let one = summarize_latencies(&[12.5]).unwrap_or_else(|| panic!("summary expected"));
    assert_eq!((one.p50, one.p95, one.p99), (12.5, 12.5, 12.5));
    assert_eq!(one.stdev, 0.0);
}

#[test]
fn uniform_spread_preserves_total() {
    for (total, secs, width) in [(1000u64, 7.3, 1.0), (1, 0.2, 1.0), (17, 59.0, 10.0), (0, 3.0, 1.0)] {
        let buckets = bucket_uniform(
            total,
            Duration::from_secs_f64(secs),
            Duration::from_secs_f64(width),
        );
        let sum: u64 = buckets.iter().map(|b| b.count).sum();
        assert_eq!(sum, total, "total={total} secs={secs} width={width}");
        assert_eq!(buckets.first().map(|b| b.start_secs), Some(0.0));
        assert!(buckets.windows(2).all(|w| w[0].end_secs == w[1].start_secs));
    }
}

#[test]
fn analysis_is_repeatable() {
    let buckets = [bucket(0.0, 5.0, 40), bucket(5.0, 10.0, 60)];
    let latencies = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
    let snapshots = [counted(0, 0), counted(5, 40), counted(10, 100)];
    let schema = MetricsSchema::default();
    let input = AnalysisInput {
        buckets: &buckets,
        latencies_ms: &latencies,
        snapshots: &snapshots,
        elapsed: Some(Duration::from_secs(10)),
        schema: &schema,
        pool_capacity: Some(10),
    };

    let first = analyze(&input);
    let second = analyze(&input);
    assert_eq!(first, second);

    let stability = &first.stability;
    assert_eq!(stability.windows.len(), 2);
    assert_eq!(stability.pool.max_total, Some(10));
    assert!(stability.pool.exhausted);

    let degradation = stability
        .degradation
        .as_ref()
        .unwrap_or_else(|| panic!("degradation expected"));
    assert!(degradation.progressed);
    assert_eq!(degradation.first_rate, Some(8.0));
    assert_eq!(degradation.last_rate, Some(12.0));
    let change = degradation
        .rate_change
        .unwrap_or_else(|| panic!("rate change expected"));
    assert!((change - 0.5).abs() < 1e-9);
}
