use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use mqload_core::RunOptions;

fn parse_duration(input: &str) -> Result<Duration, String> {
    mqload_core::config::parse_duration(input).map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "mqload",
    author,
    version,
    about = "Message-queue load harness",
    long_about = "mqload publishes a fixed volume of chat messages to a broker from many concurrent workers, polls the service under test for its metrics while the load runs, and analyzes throughput, latency and stability afterwards.\n\nSettings come from CLI flags, then MQLOAD_* environment variables, then the --config YAML file, then built-in defaults.",
    after_help = "Examples:\n  mqload run --messages 100000 --workers 20 --metrics-url http://localhost:8080/metrics\n  mqload run --config load.yaml --out-dir results/\n  mqload run --messages 5000 --broker discard:// --output json\n  mqload analyze --throughput results/throughput.csv --latency-samples delays.txt"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. info, debug, mqload_core=trace)
    #[arg(
        long,
        global = true,
        env = "MQLOAD_LOG_LEVEL",
        default_value = "info",
        value_name = "LEVEL"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate load, monitor the service and analyze the run
    #[command(
        long_about = "Publish --messages messages split across --workers workers, each bound to one destination.\n\nWhen --metrics-url is set, the service's metrics endpoint is polled for a baseline, every --poll-interval during the run, and once more after the --drain period."
    )]
    Run(Box<RunArgs>),

    /// Analyze an exported throughput table offline
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML config file; CLI flags override its values
    #[arg(long, env = "MQLOAD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Total number of messages to publish
    #[arg(long, env = "MQLOAD_MESSAGES")]
    pub messages: Option<u64>,

    /// Number of concurrent workers (default 20)
    #[arg(long, env = "MQLOAD_WORKERS")]
    pub workers: Option<u64>,

    /// Number of destinations (rooms) workers are spread over (default 20)
    #[arg(long, env = "MQLOAD_DESTINATIONS")]
    pub destinations: Option<u64>,

    /// Number of synthetic senders cycled through by every worker
    #[arg(long, env = "MQLOAD_USER_POOL")]
    pub user_pool: Option<u64>,

    /// Value of the messageType field
    #[arg(long, env = "MQLOAD_MESSAGE_TYPE")]
    pub message_type: Option<String>,

    /// Broker URL (amqp://, amqps:// or discard://)
    #[arg(long = "broker", env = "MQLOAD_BROKER_URL", value_name = "URL")]
    pub broker_url: Option<String>,

    /// Exchange messages are published to
    #[arg(long, env = "MQLOAD_EXCHANGE")]
    pub exchange: Option<String>,

    /// Routing key prefix; the destination id is appended
    #[arg(long, env = "MQLOAD_ROUTING_KEY_PREFIX", value_name = "PREFIX")]
    pub routing_key_prefix: Option<String>,

    /// Wait for a broker ack on every publish
    #[arg(long)]
    pub confirm: bool,

    /// Publish transient (non-persistent) messages
    #[arg(long)]
    pub transient: bool,

    /// Metrics endpoint of the service under test (http:// only)
    #[arg(long, env = "MQLOAD_METRICS_URL", value_name = "URL")]
    pub metrics_url: Option<String>,

    /// Interval between metrics polls (e.g. 30s, 5m)
    #[arg(long, value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Per-poll request timeout
    #[arg(long, value_parser = parse_duration)]
    pub poll_timeout: Option<Duration>,

    /// Skip the extra metrics reading taken when polling stops
    #[arg(long)]
    pub no_final_poll: bool,

    /// Grace period after the load before the final metrics reading
    #[arg(long, value_parser = parse_duration)]
    pub drain: Option<Duration>,

    /// Expected run length, shown in progress output only
    #[arg(long, value_parser = parse_duration)]
    pub duration_hint: Option<Duration>,

    /// How often live progress is reported and the sent counter sampled
    #[arg(long, value_parser = parse_duration)]
    pub progress_interval: Option<Duration>,

    /// Width of the throughput analysis intervals
    #[arg(long, value_parser = parse_duration)]
    pub bucket_width: Option<Duration>,

    /// Connection pool size of the service under test (0 disables the exhaustion check)
    #[arg(long)]
    pub pool_capacity: Option<u64>,

    /// Use externally measured latencies (ms) instead of publish latencies
    #[arg(long, value_name = "FILE")]
    pub latency_samples: Option<PathBuf>,

    /// Directory for throughput.csv and run.json
    #[arg(long, env = "MQLOAD_OUT_DIR", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

impl RunArgs {
    /// The CLI layer of the run settings. Unset flags stay `None` so lower layers can fill them.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            messages: self.messages,
            workers: self.workers,
            destinations: self.destinations,
            user_pool: self.user_pool,
            message_type: self.message_type.clone(),
            persistent: self.transient.then_some(false),
            collect_latencies: None,
            broker_url: self.broker_url.clone(),
            exchange: self.exchange.clone(),
            routing_key_prefix: self.routing_key_prefix.clone(),
            confirm: self.confirm.then_some(true),
            metrics_url: self.metrics_url.clone(),
            poll_interval: self.poll_interval,
            poll_timeout: self.poll_timeout,
            final_poll: self.no_final_poll.then_some(false),
            count_pointer: None,
            pool_pointer: None,
            drain: self.drain,
            duration_hint: self.duration_hint,
            progress_interval: self.progress_interval,
            bucket_width: self.bucket_width,
            pool_capacity: self.pool_capacity,
        }
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Interval table written by `mqload run` (startTime,endTime,messageCount,...)
    #[arg(long, value_name = "FILE.csv")]
    pub throughput: PathBuf,

    /// Latency samples in ms, one per line or a CSV with a latencyMs column
    #[arg(long, value_name = "FILE")]
    pub latency_samples: Option<PathBuf>,

    /// run.json of the same run, for the stability section
    #[arg(long, value_name = "FILE")]
    pub run_json: Option<PathBuf>,

    /// Connection pool size of the service under test (0 disables the exhaustion check)
    #[arg(long, default_value_t = mqload_core::config::DEFAULT_POOL_CAPACITY)]
    pub pool_capacity: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
