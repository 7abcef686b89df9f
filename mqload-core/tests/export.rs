use std::time::Duration;

use chrono::Utc;
use mqload_core::analysis::{AnalysisReport, IntervalBucket};
use mqload_core::export::{
    RunArtifact, read_latency_samples, read_monitoring_log, read_throughput_csv, write_run_json,
    write_throughput_csv,
};
use mqload_core::monitor::MetricsSnapshot;
use mqload_core::runner::{CounterSample, RunResult, WorkerResult};

fn sample_run() -> RunResult {
    let now = Utc::now();
    RunResult {
        total_messages: 10,
        total_sent: 9,
        total_failed: 1,
        workers: vec![WorkerResult {
            worker_id: 0,
            destination_id: 1,
            share: 10,
            sent: 9,
            failed: 1,
            connect_error: None,
        }],
        started_at: now,
        finished_at: now,
        duration: Duration::from_millis(1500),
        throughput: 6.0,
        cancelled: false,
        publish_latencies_ms: vec![1.0; 9],
    }
}

#[test]
fn throughput_table_round_trips() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("nested").join("throughput.csv");
    let buckets = vec![
        IntervalBucket {
            start_secs: 0.0,
            end_secs: 10.0,
            count: 100,
        },
        IntervalBucket {
            start_secs: 10.0,
            end_secs: 20.0,
            count: 0,
        },
    ];

    write_throughput_csv(&path, &buckets).unwrap_or_else(|e| panic!("write: {e}"));

    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read: {e}"));
    let header = text.lines().next().unwrap_or_default();
    assert_eq!(header, "startTime,endTime,messageCount,messagesPerSecond");
    assert!(text.contains("0.0,10.0,100,10.0"), "{text}");

    let back = read_throughput_csv(&path).unwrap_or_else(|e| panic!("read back: {e}"));
    assert_eq!(back, buckets);
}

#[test]
fn run_document_uses_camel_case_and_seconds() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("run.json");

    let run = sample_run();
    let snapshots = vec![MetricsSnapshot::unavailable(
        Utc::now(),
        Duration::from_millis(250),
        "connection refused".to_string(),
    )];
    let samples = vec![
        CounterSample {
            elapsed: Duration::ZERO,
            total: 0,
        },
        CounterSample {
            elapsed: Duration::from_millis(1500),
            total: 9,
        },
    ];
    let report = AnalysisReport::default();

    write_run_json(
        &path,
        &RunArtifact {
            run: &run,
            monitoring: &snapshots,
            throughput_samples: &samples,
            report: &report,
        },
    )
    .unwrap_or_else(|e| panic!("write: {e}"));

    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read: {e}"));
    let v: serde_json::Value =
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("json: {e}"));

    assert_eq!(v["run"]["totalSent"], 9);
    assert_eq!(v["run"]["duration"], 1.5);
    assert!(v["run"].get("publishLatenciesMs").is_none());
    assert_eq!(v["monitoring"][0]["payload"]["status"], "unavailable");
    assert_eq!(v["throughputSamples"][1]["total"], 9);
    assert!(v["report"]["throughput"].is_object());

    let log = read_monitoring_log(&path).unwrap_or_else(|e| panic!("read log: {e}"));
    assert_eq!(log, snapshots);
}

#[test]
fn latency_samples_from_file() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("latencies.txt");
    std::fs::write(&path, "# ms\n10\n20\n30\n40\n50\n").unwrap_or_else(|e| panic!("write: {e}"));

    let v = read_latency_samples(&path).unwrap_or_else(|e| panic!("read: {e}"));
    assert_eq!(v, vec![10.0, 20.0, 30.0, 40.0, 50.0]);

    let missing = read_latency_samples(&dir.path().join("nope.txt"));
    assert!(missing.is_err());
}
