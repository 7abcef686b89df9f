use anyhow::Context as _;

use mqload_core::analysis::AnalysisInput;
use mqload_core::analyze;
use mqload_core::config::MetricsSchema;
use mqload_core::export::{read_latency_samples, read_monitoring_log, read_throughput_csv};

use crate::cli::AnalyzeArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

/// Offline analysis over exported files. Unreadable inputs are invalid input.
pub fn analyze_files(args: AnalyzeArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let buckets = read_throughput_csv(&args.throughput)
        .with_context(|| {
            format!(
                "failed to read throughput table: {}",
                args.throughput.display()
            )
        })
        .map_err(RunError::InvalidInput)?;

    let latencies = match &args.latency_samples {
        Some(path) => read_latency_samples(path)
            .with_context(|| format!("failed to read latency samples: {}", path.display()))
            .map_err(RunError::InvalidInput)?,
        None => Vec::new(),
    };

    let snapshots = match &args.run_json {
        Some(path) => read_monitoring_log(path)
            .with_context(|| format!("failed to read run document: {}", path.display()))
            .map_err(RunError::InvalidInput)?,
        None => Vec::new(),
    };

    let schema = MetricsSchema::default();
    let report = analyze(&AnalysisInput {
        buckets: &buckets,
        latencies_ms: &latencies,
        snapshots: &snapshots,
        elapsed: None,
        schema: &schema,
        pool_capacity: (args.pool_capacity > 0).then_some(args.pool_capacity),
    });

    out.print_analysis(&report).map_err(RunError::RuntimeError)?;
    Ok(ExitCode::Success)
}
