use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::MetricsSchema;

/// One poll of the metrics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Time since the run started.
    #[serde(with = "crate::serde_duration::secs")]
    pub elapsed: Duration,
    pub payload: SnapshotPayload,
}

/// The endpoint's document, stored verbatim, or the reason the poll produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SnapshotPayload {
    Available { data: Value },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGauges {
    pub active: u64,
    pub idle: u64,
    pub total: u64,
}

impl MetricsSnapshot {
    pub fn available(timestamp: DateTime<Utc>, elapsed: Duration, data: Value) -> Self {
        Self {
            timestamp,
            elapsed,
            payload: SnapshotPayload::Available { data },
        }
    }

    pub fn unavailable(timestamp: DateTime<Utc>, elapsed: Duration, reason: String) -> Self {
        Self {
            timestamp,
            elapsed,
            payload: SnapshotPayload::Unavailable { reason },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.payload, SnapshotPayload::Available { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.payload {
            SnapshotPayload::Available { data } => Some(data),
            SnapshotPayload::Unavailable { .. } => None,
        }
    }

    /// The cumulative message counter, if present and a non-negative number.
    pub fn cumulative_count(&self, schema: &MetricsSchema) -> Option<u64> {
        let v = self.data()?.pointer(&schema.count_pointer)?;
        if let Some(n) = v.as_u64() {
            return Some(n);
        }
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    }

    /// Connection-pool gauges. Missing gauges inside a present pool object read as zero.
    pub fn pool_gauges(&self, schema: &MetricsSchema) -> Option<PoolGauges> {
        let pool = self.data()?.pointer(&schema.pool_pointer)?.as_object()?;
        let gauge = |key: &str| pool.get(key).and_then(Value::as_u64).unwrap_or(0);
        Some(PoolGauges {
            active: gauge("active"),
            idle: gauge("idle"),
            total: gauge("total"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(data: Value) -> MetricsSnapshot {
        MetricsSnapshot::available(Utc::now(), Duration::from_secs(1), data)
    }

    #[test]
    fn reads_count_and_pool_through_schema() {
        let schema = MetricsSchema::default();
        let s = snap(json!({
            "coreQueries": { "totalMessages": 1234 },
            "connectionPool": { "active": 3, "idle": 7, "total": 10 }
        }));

        assert_eq!(s.cumulative_count(&schema), Some(1234));
        assert_eq!(
            s.pool_gauges(&schema),
            Some(PoolGauges {
                active: 3,
                idle: 7,
                total: 10
            })
        );
    }

    #[test]
    fn missing_or_negative_count_is_none() {
        let schema = MetricsSchema::default();
        assert_eq!(snap(json!({"other": 1})).cumulative_count(&schema), None);
        assert_eq!(
            snap(json!({"coreQueries": {"totalMessages": -4}})).cumulative_count(&schema),
            None
        );
        assert_eq!(
            snap(json!({"coreQueries": {"totalMessages": 12.0}})).cumulative_count(&schema),
            Some(12)
        );

        let down = MetricsSnapshot::unavailable(Utc::now(), Duration::ZERO, "timeout".into());
        assert!(!down.is_available());
        assert_eq!(down.cumulative_count(&schema), None);
        assert_eq!(down.pool_gauges(&schema), None);
    }

    #[test]
    fn payload_is_tagged_in_json() {
        let down = MetricsSnapshot::unavailable(Utc::now(), Duration::from_secs(2), "boom".into());
        let v = serde_json::to_value(&down).unwrap_or_else(|e| panic!("serialize: {e}"));
        assert_eq!(v["payload"]["status"], "unavailable");
        assert_eq!(v["payload"]["reason"], "boom");
        assert_eq!(v["elapsed"], 2.0);
    }
}
