use std::fmt::Write as _;

use mqload_core::analysis::{LatencySummary, StabilitySection, ThroughputSummary};
use mqload_core::{AnalysisReport, RunOutcome};

use super::super::ExportedFiles;
use super::format::*;

pub(crate) fn render_run(
    outcome: &RunOutcome,
    report: &AnalysisReport,
    files: Option<&ExportedFiles>,
) -> String {
    let mut out = String::new();
    let run = &outcome.run;

    out.push_str("summary\n");
    if run.cancelled {
        out.push_str("  run was interrupted; counts are partial\n");
    }
    writeln!(
        &mut out,
        "  messages: {} sent, {} failed, {} unsent (planned {})",
        run.total_sent,
        run.total_failed,
        run.unsent(),
        run.total_messages
    )
    .ok();
    writeln!(
        &mut out,
        "  duration: {} throughput: {} msg/s",
        format_secs(run.duration.as_secs_f64()),
        format_rate(run.throughput)
    )
    .ok();

    let refused: Vec<_> = run
        .workers
        .iter()
        .filter(|w| w.connect_error.is_some())
        .collect();
    if !refused.is_empty() {
        writeln!(&mut out, "  workers without connection: {}", refused.len()).ok();
        for w in refused {
            writeln!(
                &mut out,
                "    worker {} (destination {}): {}",
                w.worker_id,
                w.destination_id,
                w.connect_error.as_deref().unwrap_or_default()
            )
            .ok();
        }
    }
    out.push('\n');

    render_report(report, &mut out);

    if let Some(files) = files {
        out.push_str("files\n");
        writeln!(&mut out, "  {}", files.throughput_csv.display()).ok();
        writeln!(&mut out, "  {}", files.run_json.display()).ok();
    }

    out
}

pub(crate) fn render_analysis(report: &AnalysisReport) -> String {
    let mut out = String::new();
    render_report(report, &mut out);
    out
}

fn render_report(report: &AnalysisReport, out: &mut String) {
    render_throughput(&report.throughput, out);
    render_latency(report.latency.as_ref(), out);
    render_stability(&report.stability, out);
}

fn render_throughput(t: &ThroughputSummary, out: &mut String) {
    out.push_str("throughput\n");
    if t.buckets.is_empty() {
        out.push_str("  no data\n\n");
        return;
    }

    writeln!(
        out,
        "  intervals: {} messages: {} mean: {} msg/s average: {} msg/s",
        t.buckets.len(),
        t.total_count,
        t.mean_rate.map_or_else(|| "-".to_string(), format_rate),
        t.average_throughput
            .map_or_else(|| "-".to_string(), format_rate)
    )
    .ok();
    if let Some(p) = &t.peak {
        writeln!(
            out,
            "  peak: {} msg/s in [{}, {})",
            format_rate(p.rate),
            format_secs(p.start_secs),
            format_secs(p.end_secs)
        )
        .ok();
    }
    if let Some(m) = &t.min {
        writeln!(
            out,
            "  min:  {} msg/s in [{}, {})",
            format_rate(m.rate),
            format_secs(m.start_secs),
            format_secs(m.end_secs)
        )
        .ok();
    }
    out.push('\n');
}

fn render_latency(l: Option<&LatencySummary>, out: &mut String) {
    match l {
        Some(l) => {
            writeln!(
                out,
                "latency = p50={} p95={} p99={} mean={} stdev={} min={} max={} (n={})\n",
                format_ms(l.p50),
                format_ms(l.p95),
                format_ms(l.p99),
                format_ms(l.mean),
                format_ms(l.stdev),
                format_ms(l.min),
                format_ms(l.max),
                l.count
            )
            .ok();
        }
        None => out.push_str("latency: n/a\n\n"),
    }
}

fn render_stability(s: &StabilitySection, out: &mut String) {
    out.push_str("stability\n");
    if s.snapshots == 0 {
        out.push_str("  no metrics snapshots\n");
        return;
    }

    writeln!(
        out,
        "  snapshots: {} (unavailable {})",
        s.snapshots, s.unavailable
    )
    .ok();
    for w in &s.windows {
        writeln!(
            out,
            "  [{}, {}] {:+} messages, {} msg/s",
            format_secs(w.from_secs),
            format_secs(w.to_secs),
            w.delta_count,
            format_rate(w.rate)
        )
        .ok();
    }
    if s.skipped_pairs > 0 {
        writeln!(out, "  skipped pairs: {}", s.skipped_pairs).ok();
    }

    if s.pool.samples > 0 {
        writeln!(
            out,
            "  pool: max active {} max total {} capacity {}{}",
            s.pool.max_active.unwrap_or_default(),
            s.pool.max_total.unwrap_or_default(),
            s.pool
                .capacity
                .map_or_else(|| "-".to_string(), |c| c.to_string()),
            if s.pool.exhausted { " (EXHAUSTED)" } else { "" }
        )
        .ok();
    }

    match &s.degradation {
        Some(d) => {
            let status = if d.progressed {
                "progressing"
            } else {
                "NOT progressing"
            };
            writeln!(
                out,
                "  counter: {} -> {} ({status})",
                d.first_count, d.last_count
            )
            .ok();
            if let Some(change) = d.rate_change {
                writeln!(out, "  rate change first -> last window: {}", format_pct(change)).ok();
            }
        }
        None => out.push_str("  counter: fewer than two readings\n"),
    }
}
