use crate::cli::OutputFormat;
use std::path::PathBuf;

use mqload_core::{AnalysisReport, ProgressFn, RunConfig, RunOutcome};

mod human;
mod json;

/// Files written for a run.
#[derive(Debug, Clone)]
pub(crate) struct ExportedFiles {
    pub throughput_csv: PathBuf,
    pub run_json: PathBuf,
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &RunConfig);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_run_summary(
        &self,
        outcome: &RunOutcome,
        report: &AnalysisReport,
        files: Option<&ExportedFiles>,
    ) -> anyhow::Result<()>;
    fn print_analysis(&self, report: &AnalysisReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
