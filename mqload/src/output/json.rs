use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use mqload_core::{AnalysisReport, ProgressFn, ProgressUpdate, RunConfig, RunOutcome, RunResult};

use super::{ExportedFiles, OutputFormatter};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &RunConfig) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_run_summary(
        &self,
        outcome: &RunOutcome,
        report: &AnalysisReport,
        files: Option<&ExportedFiles>,
    ) -> anyhow::Result<()> {
        let line = JsonSummaryLine {
            kind: "summary",
            run: &outcome.run,
            snapshots_total: outcome.snapshots.len(),
            snapshots_unavailable: outcome.snapshots.iter().filter(|s| !s.is_available()).count(),
            report,
            files: files.map(|f| JsonFiles {
                throughput_csv: f.throughput_csv.display().to_string(),
                run_json: f.run_json.display().to_string(),
            }),
        };
        emit_json_line(&line);
        Ok(())
    }

    fn print_analysis(&self, report: &AnalysisReport) -> anyhow::Result<()> {
        emit_json_line(&JsonAnalysisLine {
            kind: "analysis",
            report,
        });
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub total_messages: u64,
    pub sent_total: u64,
    pub failed_total: u64,
    pub active_workers: u64,
    pub completion: f64,

    pub messages_per_sec: f64,
    pub messages_per_sec_avg: f64,
    pub messages_per_sec_max: f64,

    pub latency_p50_ms: Option<f64>,
    pub latency_p99_ms: Option<f64>,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        total_messages: u.total_messages,
        sent_total: u.sent_total,
        failed_total: u.failed_total,
        active_workers: u.active_workers,
        completion: u.completion(),
        messages_per_sec: u.rate_now,
        messages_per_sec_avg: u.rate_avg,
        messages_per_sec_max: u.rate_max,
        latency_p50_ms: u.latency_p50_ms_now,
        latency_p99_ms: u.latency_p99_ms_now,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonSummaryLine<'a> {
    pub kind: &'static str,
    pub run: &'a RunResult,
    pub snapshots_total: usize,
    pub snapshots_unavailable: usize,
    pub report: &'a AnalysisReport,
    pub files: Option<JsonFiles>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonFiles {
    pub throughput_csv: String,
    pub run_json: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonAnalysisLine<'a> {
    pub kind: &'static str,
    pub report: &'a AnalysisReport,
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn progress_line_has_kind_and_completion() {
        let u = ProgressUpdate {
            tick: 3,
            elapsed: Duration::from_millis(1500),
            total_messages: 1000,
            sent_total: 240,
            failed_total: 10,
            active_workers: 4,
            rate_now: 160.0,
            rate_avg: 166.7,
            rate_max: 180.0,
            latency_p50_ms_now: Some(1.2),
            latency_p99_ms_now: None,
            duration_hint: None,
        };

        let v: Value = match serde_json::to_value(build_progress_line(&u)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("progress"));
        assert_eq!(v.get("sentTotal").and_then(Value::as_u64), Some(240));
        assert_eq!(v.get("completion").and_then(Value::as_f64), Some(0.25));
        assert_eq!(v.get("elapsedSecs").and_then(Value::as_f64), Some(1.5));
        assert!(v.get("latencyP99Ms").is_some_and(Value::is_null));
    }

    #[test]
    fn analysis_line_embeds_report() {
        let report = AnalysisReport::default();
        let v: Value = match serde_json::to_value(JsonAnalysisLine {
            kind: "analysis",
            report: &report,
        }) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("analysis"));
        assert_eq!(
            v.pointer("/report/throughput/totalCount")
                .and_then(Value::as_u64),
            Some(0)
        );
    }
}
