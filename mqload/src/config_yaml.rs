use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use mqload_core::RunOptions;

/// The `--config` file. Every key is optional; sections may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigYaml {
    #[serde(default)]
    pub load: LoadYaml,
    #[serde(default)]
    pub broker: BrokerYaml,
    #[serde(default)]
    pub monitor: MonitorYaml,
    #[serde(default)]
    pub analysis: AnalysisYaml,

    #[serde(default)]
    pub drain: Option<YamlDuration>,
    #[serde(default)]
    pub duration_hint: Option<YamlDuration>,
    #[serde(default)]
    pub progress_interval: Option<YamlDuration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct LoadYaml {
    pub messages: Option<u64>,
    pub workers: Option<u64>,
    pub destinations: Option<u64>,
    pub user_pool: Option<u64>,
    pub message_type: Option<String>,
    pub persistent: Option<bool>,
    pub collect_latencies: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct BrokerYaml {
    pub url: Option<String>,
    pub exchange: Option<String>,
    pub routing_key_prefix: Option<String>,
    pub confirm: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct MonitorYaml {
    pub metrics_url: Option<String>,
    #[serde(default)]
    pub poll_interval: Option<YamlDuration>,
    #[serde(default)]
    pub poll_timeout: Option<YamlDuration>,
    pub final_poll: Option<bool>,
    pub count_pointer: Option<String>,
    pub pool_pointer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct AnalysisYaml {
    #[serde(default)]
    pub bucket_width: Option<YamlDuration>,
    pub pool_capacity: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(|secs| YamlDuration(Duration::from_secs(secs)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::try_from_secs_f64(v)
                    .map(YamlDuration)
                    .map_err(|_| E::custom("duration must be a non-negative, finite number"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v.trim()).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

fn dur(v: Option<YamlDuration>) -> Option<Duration> {
    v.map(YamlDuration::into_inner)
}

impl From<ConfigYaml> for RunOptions {
    fn from(doc: ConfigYaml) -> Self {
        RunOptions {
            messages: doc.load.messages,
            workers: doc.load.workers,
            destinations: doc.load.destinations,
            user_pool: doc.load.user_pool,
            message_type: doc.load.message_type,
            persistent: doc.load.persistent,
            collect_latencies: doc.load.collect_latencies,

            broker_url: doc.broker.url,
            exchange: doc.broker.exchange,
            routing_key_prefix: doc.broker.routing_key_prefix,
            confirm: doc.broker.confirm,

            metrics_url: doc.monitor.metrics_url,
            poll_interval: dur(doc.monitor.poll_interval),
            poll_timeout: dur(doc.monitor.poll_timeout),
            final_poll: doc.monitor.final_poll,
            count_pointer: doc.monitor.count_pointer,
            pool_pointer: doc.monitor.pool_pointer,

            drain: dur(doc.drain),
            duration_hint: dur(doc.duration_hint),
            progress_interval: dur(doc.progress_interval),
            bucket_width: dur(doc.analysis.bucket_width),
            pool_capacity: doc.analysis.pool_capacity,
        }
    }
}

pub(crate) fn parse_run_options(bytes: &[u8]) -> anyhow::Result<RunOptions> {
    // An empty file is a valid, empty config.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunOptions::default());
    }
    let doc: ConfigYaml = serde_yaml::from_slice(bytes)?;
    Ok(doc.into())
}

pub(crate) async fn load_run_options(path: &Path) -> anyhow::Result<RunOptions> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    parse_run_options(&bytes)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))
}
