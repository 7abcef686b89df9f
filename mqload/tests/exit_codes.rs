use std::process::Command;

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn run_mqload(args: &[&str]) -> anyhow::Result<std::process::Output> {
    Command::new(env!("CARGO_BIN_EXE_mqload"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("MQLOAD_MESSAGES")
        .env_remove("MQLOAD_CONFIG")
        .output()
        .context("run mqload binary")
}

fn ensure_code(out: &std::process::Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&["run", "--messages", "10", "--drain", "10x"])?;
    ensure_code(&out, 30)
}

#[test]
fn zero_workers_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&[
        "run",
        "--messages",
        "10",
        "--workers",
        "0",
        "--broker",
        "discard://",
    ])?;
    ensure_code(&out, 30)?;

    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(stderr.contains("workers"), "stderr:\n{stderr}");
    Ok(())
}

#[test]
fn missing_message_count_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&["run", "--broker", "discard://"])?;
    ensure_code(&out, 30)
}

#[test]
fn unknown_broker_scheme_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&["run", "--messages", "10", "--broker", "kafka://localhost"])?;
    ensure_code(&out, 30)
}

#[test]
fn missing_config_file_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&["run", "--config", "./does-not-exist.yaml"])?;
    ensure_code(&out, 30)
}

#[test]
fn missing_throughput_table_exit_30() -> anyhow::Result<()> {
    let out = run_mqload(&["analyze", "--throughput", "./does-not-exist.csv"])?;
    ensure_code(&out, 30)
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let out = run_mqload(&["--help"])?;
    ensure_code(&out, 0)
}
