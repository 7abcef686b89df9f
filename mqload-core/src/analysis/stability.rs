use serde::{Deserialize, Serialize};

use crate::config::MetricsSchema;
use crate::monitor::MetricsSnapshot;

/// Throughput observed by the service between two consecutive usable snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityWindow {
    pub from_secs: f64,
    pub to_secs: f64,
    pub from_count: u64,
    pub to_count: u64,
    /// Negative when the service counter went backwards (e.g. restarted).
    pub delta_count: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStability {
    pub samples: usize,
    pub max_active: Option<u64>,
    pub max_total: Option<u64>,
    pub capacity: Option<u64>,
    /// `max_total` reached `capacity`.
    pub exhausted: bool,
}

/// First versus latest observation. Informational; callers decide what counts as degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationCheck {
    pub first_secs: f64,
    pub last_secs: f64,
    pub first_count: u64,
    pub last_count: u64,
    /// The service kept processing between the first and last snapshot.
    pub progressed: bool,
    pub first_rate: Option<f64>,
    pub last_rate: Option<f64>,
    /// `last_rate / first_rate - 1`; `None` without two windows or when the first rate is 0.
    pub rate_change: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilitySection {
    pub snapshots: usize,
    pub unavailable: usize,
    pub windows: Vec<StabilityWindow>,
    /// Consecutive pairs dropped for a zero or negative time delta.
    pub skipped_pairs: usize,
    pub pool: PoolStability,
    pub degradation: Option<DegradationCheck>,
}

pub fn stability_section(
    snapshots: &[MetricsSnapshot],
    schema: &MetricsSchema,
    pool_capacity: Option<u64>,
) -> StabilitySection {
    let counted: Vec<(f64, u64)> = snapshots
        .iter()
        .filter_map(|s| Some((s.elapsed.as_secs_f64(), s.cumulative_count(schema)?)))
        .collect();

    let mut windows = Vec::new();
    let mut skipped_pairs = 0usize;
    for pair in counted.windows(2) {
        let (t_a, c_a) = pair[0];
        let (t_b, c_b) = pair[1];
        let dt = t_b - t_a;
        if dt <= 0.0 {
            skipped_pairs += 1;
            continue;
        }
        let delta_count = i64::try_from(c_b).unwrap_or(i64::MAX)
            - i64::try_from(c_a).unwrap_or(i64::MAX);
        windows.push(StabilityWindow {
            from_secs: t_a,
            to_secs: t_b,
            from_count: c_a,
            to_count: c_b,
            delta_count,
            rate: delta_count as f64 / dt,
        });
    }

    let degradation = match (counted.first(), counted.last()) {
        (Some(&(first_secs, first_count)), Some(&(last_secs, last_count)))
            if counted.len() >= 2 =>
        {
            let first_rate = windows.first().map(|w| w.rate);
            let last_rate = windows.last().map(|w| w.rate);
            let rate_change = match (first_rate, last_rate) {
                (Some(a), Some(b)) if windows.len() >= 2 && a != 0.0 => Some(b / a - 1.0),
                _ => None,
            };
            Some(DegradationCheck {
                first_secs,
                last_secs,
                first_count,
                last_count,
                progressed: last_count > first_count,
                first_rate,
                last_rate,
                rate_change,
            })
        }
        _ => None,
    };

    StabilitySection {
        snapshots: snapshots.len(),
        unavailable: snapshots.iter().filter(|s| !s.is_available()).count(),
        windows,
        skipped_pairs,
        pool: pool_stability(snapshots, schema, pool_capacity),
        degradation,
    }
}

fn pool_stability(
    snapshots: &[MetricsSnapshot],
    schema: &MetricsSchema,
    capacity: Option<u64>,
) -> PoolStability {
    let gauges: Vec<_> = snapshots.iter().filter_map(|s| s.pool_gauges(schema)).collect();
    let max_active = gauges.iter().map(|g| g.active).max();
    let max_total = gauges.iter().map(|g| g.total).max();

    PoolStability {
        samples: gauges.len(),
        max_active,
        max_total,
        capacity,
        exhausted: matches!((max_total, capacity), (Some(t), Some(c)) if t >= c),
    }
}
