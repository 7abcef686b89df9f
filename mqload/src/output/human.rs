use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_duration, format_ms_opt, format_rate};
use progress::HumanProgress;
use summary::{render_analysis, render_run};

use mqload_core::{AnalysisReport, ProgressFn, RunConfig, RunOutcome};

use super::{ExportedFiles, OutputFormatter};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &RunConfig) {
        println!(
            "load: messages={} workers={} destinations={} broker={}",
            cfg.load.total_messages, cfg.load.workers, cfg.load.destinations, cfg.broker.url
        );
        match &cfg.monitor {
            Some(m) => println!(
                "monitor: {} every {} (drain {})",
                m.url,
                format_duration(m.interval),
                format_duration(cfg.drain)
            ),
            None => println!("monitor: off"),
        }
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let mut message = format!(
                "elapsed={} rate={}/s avg={}/s failed={} workers={} p50={} p99={}",
                format_duration(u.elapsed),
                format_rate(u.rate_now),
                format_rate(u.rate_avg),
                u.failed_total,
                u.active_workers,
                format_ms_opt(u.latency_p50_ms_now),
                format_ms_opt(u.latency_p99_ms_now),
            );
            if let Some(hint) = u.duration_hint {
                message.push_str(&format!(" of ~{}", format_duration(hint)));
            }

            progress.update(
                u.total_messages,
                u.sent_total.saturating_add(u.failed_total),
                message,
            );
        }))
    }

    fn print_run_summary(
        &self,
        outcome: &RunOutcome,
        report: &AnalysisReport,
        files: Option<&ExportedFiles>,
    ) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render_run(outcome, report, files));
        Ok(())
    }

    fn print_analysis(&self, report: &AnalysisReport) -> anyhow::Result<()> {
        print!("{}", render_analysis(report));
        Ok(())
    }
}
