use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{AnalysisReport, IntervalBucket};
use crate::error::{Error, Result};
use crate::monitor::MetricsSnapshot;
use crate::runner::{CounterSample, RunResult};

pub const LATENCY_COLUMN: &str = "latencyMs";

/// One row of the interval table; times are seconds since run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThroughputRow {
    start_time: f64,
    end_time: f64,
    message_count: u64,
    messages_per_second: f64,
}

/// The JSON document saved for every run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArtifact<'a> {
    pub run: &'a RunResult,
    pub monitoring: &'a [MetricsSnapshot],
    pub throughput_samples: &'a [CounterSample],
    pub report: &'a AnalysisReport,
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)?,
        _ => {}
    }
    Ok(())
}

pub fn write_throughput_csv(path: &Path, buckets: &[IntervalBucket]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for b in buckets {
        wtr.serialize(ThroughputRow {
            start_time: b.start_secs,
            end_time: b.end_secs,
            message_count: b.count,
            messages_per_second: b.rate(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads an interval table written by [`write_throughput_csv`]. The rate column is derived
/// and ignored on input.
pub fn read_throughput_csv(path: &Path) -> Result<Vec<IntervalBucket>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize::<ThroughputRow>() {
        let row = row?;
        out.push(IntervalBucket {
            start_secs: row.start_time,
            end_secs: row.end_time,
            count: row.message_count,
        });
    }
    Ok(out)
}

pub fn write_run_json(path: &Path, artifact: &RunArtifact<'_>) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[derive(Deserialize)]
struct MonitoringOnly {
    #[serde(default)]
    monitoring: Vec<MetricsSnapshot>,
}

/// The snapshot log of a run document written by [`write_run_json`]. Other fields are ignored.
pub fn read_monitoring_log(path: &Path) -> Result<Vec<MetricsSnapshot>> {
    let text = std::fs::read_to_string(path)?;
    let doc: MonitoringOnly = serde_json::from_str(&text)?;
    Ok(doc.monitoring)
}

/// Latency samples in milliseconds: one number per line, or a CSV with a `latencyMs` column.
/// Blank lines and `#` comments are skipped.
pub fn read_latency_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)?;
    parse_latency_samples(&text)
}

pub fn parse_latency_samples(text: &str) -> Result<Vec<f64>> {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));
    let is_table = first.is_some_and(|l| l.split(',').any(|c| c.trim() == LATENCY_COLUMN));

    if is_table {
        return parse_latency_table(text);
    }

    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let v: f64 = line.parse().map_err(|_| Error::InvalidLatencySample {
            line: idx + 1,
            value: line.to_string(),
        })?;
        out.push(v);
    }
    Ok(out)
}

fn parse_latency_table(text: &str) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let column = rdr
        .headers()?
        .iter()
        .position(|h| h == LATENCY_COLUMN)
        .ok_or_else(|| Error::InvalidLatencySample {
            line: 1,
            value: LATENCY_COLUMN.to_string(),
        })?;

    let mut out = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let Some(cell) = record.get(column) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);
        let v: f64 = cell.parse().map_err(|_| Error::InvalidLatencySample {
            line,
            value: cell.to_string(),
        })?;
        out.push(v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_lines_with_comments() {
        let v = parse_latency_samples("# delays\n10\n\n20.5\n  30 \n")
            .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(v, vec![10.0, 20.5, 30.0]);
    }

    #[test]
    fn parses_latency_column() {
        let v = parse_latency_samples("messageId,latencyMs\nmsg_1_0_0,12\nmsg_1_0_1, 14.5\n")
            .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(v, vec![12.0, 14.5]);
    }

    #[test]
    fn reports_bad_line() {
        match parse_latency_samples("1\nfast\n") {
            Err(Error::InvalidLatencySample { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
