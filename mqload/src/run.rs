use anyhow::Context as _;
use std::path::Path;
use tracing::{info, warn};

use mqload_core::export::{RunArtifact, read_latency_samples, write_run_json, write_throughput_csv};
use mqload_core::orchestrator::throughput_buckets;
use mqload_core::{
    AnalysisReport, RunConfig, RunDeps, RunOptions, RunOutcome, analyze_outcome,
    config_from_options, execute_run,
};

use crate::cli::RunArgs;
use crate::config_yaml;
use crate::exit_codes::ExitCode;
use crate::output::{self, ExportedFiles};
use crate::run_error::RunError;

pub const THROUGHPUT_FILE: &str = "throughput.csv";
pub const RUN_FILE: &str = "run.json";

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file_opts = match &args.config {
        Some(path) => config_yaml::load_run_options(path)
            .await
            .map_err(RunError::InvalidInput)?,
        None => RunOptions::default(),
    };
    let cfg = config_from_options(file_opts, args.run_options())
        .map_err(|err| RunError::from_core("invalid run config", err))?;

    let external_latencies = match &args.latency_samples {
        Some(path) => Some(
            read_latency_samples(path)
                .with_context(|| format!("failed to read latency samples: {}", path.display()))
                .map_err(RunError::InvalidInput)?,
        ),
        None => None,
    };

    let mut deps = RunDeps::from_config(&cfg)
        .map_err(|err| RunError::from_core("failed to set up broker connector", err))?;
    deps.progress = out.progress();

    let cancel = deps.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping workers");
            cancel.stop();
        }
    });

    out.print_header(&cfg);
    let outcome = execute_run(&cfg, deps).await;
    interrupt.abort();
    let outcome = outcome.map_err(|err| RunError::from_core("run failed", err))?;

    let report = analyze_outcome(&outcome, &cfg, external_latencies.as_deref());

    let files = match &args.out_dir {
        Some(dir) => Some(
            export_run(dir, &cfg, &outcome, &report)
                .map_err(|err| RunError::from_core("failed to write run files", err))?,
        ),
        None => None,
    };

    out.print_run_summary(&outcome, &report, files.as_ref())
        .map_err(RunError::RuntimeError)?;

    if outcome.run.cancelled {
        warn!(
            sent = outcome.run.total_sent,
            unsent = outcome.run.unsent(),
            "run was interrupted"
        );
    }

    Ok(ExitCode::Success)
}

fn export_run(
    dir: &Path,
    cfg: &RunConfig,
    outcome: &RunOutcome,
    report: &AnalysisReport,
) -> mqload_core::Result<ExportedFiles> {
    let files = ExportedFiles {
        throughput_csv: dir.join(THROUGHPUT_FILE),
        run_json: dir.join(RUN_FILE),
    };

    write_throughput_csv(&files.throughput_csv, &throughput_buckets(outcome, cfg))?;
    write_run_json(
        &files.run_json,
        &RunArtifact {
            run: &outcome.run,
            monitoring: &outcome.snapshots,
            throughput_samples: &outcome.throughput_samples,
            report,
        },
    )?;

    info!(dir = %dir.display(), "run files written");
    Ok(files)
}
