use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::runner::CounterSample;

/// `[start, end)` window with the messages attributed to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalBucket {
    pub start_secs: f64,
    pub end_secs: f64,
    pub count: u64,
}

impl IntervalBucket {
    pub fn width(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Messages per second; 0 for a degenerate window.
    pub fn rate(&self) -> f64 {
        let w = self.width();
        if w > 0.0 { self.count as f64 / w } else { 0.0 }
    }
}

/// A span of work (e.g. one measurement interval) and how many messages it completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkUnit {
    pub start_secs: f64,
    pub end_secs: f64,
    pub count: u64,
}

/// Upper bound on the number of buckets a table may hold. At the default 10 s width this is
/// about four months of run time.
pub const MAX_BUCKETS: usize = 1 << 20;

/// Assigns each unit to the bucket containing its midpoint.
///
/// Buckets start at 0, are contiguous, and reach at least the latest unit end. Windows
/// without data are kept with a zero count. Units with a negative or non-finite midpoint,
/// or one past [`MAX_BUCKETS`] windows, are ignored.
pub fn bucket_units(units: &[WorkUnit], width: Duration) -> Vec<IntervalBucket> {
    let w = width.as_secs_f64();
    if !(w > 0.0 && w.is_finite()) {
        return Vec::new();
    }

    let mut counts: Vec<u64> = Vec::new();
    let mut horizon = 0.0f64;

    for u in units {
        let mid = (u.start_secs + u.end_secs) / 2.0;
        if !mid.is_finite() || mid < 0.0 {
            continue;
        }
        let slot = (mid / w).floor();
        if slot >= MAX_BUCKETS as f64 {
            continue;
        }
        horizon = horizon.max(u.end_secs.max(mid));

        let idx = slot as usize;
        if counts.len() <= idx {
            counts.resize(idx + 1, 0);
        }
        counts[idx] = counts[idx].saturating_add(u.count);
    }

    let covering = (horizon / w).ceil().min(MAX_BUCKETS as f64) as usize;
    if counts.len() < covering {
        counts.resize(covering, 0);
    }

    to_buckets(&counts, w)
}

/// Point events at offsets (seconds since run start).
pub fn bucket_events(events: &[(f64, u64)], width: Duration) -> Vec<IntervalBucket> {
    let units: Vec<WorkUnit> = events
        .iter()
        .map(|&(at, count)| WorkUnit {
            start_secs: at,
            end_secs: at,
            count,
        })
        .collect();
    bucket_units(&units, width)
}

/// A cumulative counter sampled over time; each consecutive pair becomes one unit.
pub fn bucket_cumulative(samples: &[CounterSample], width: Duration) -> Vec<IntervalBucket> {
    let units: Vec<WorkUnit> = samples
        .windows(2)
        .map(|pair| WorkUnit {
            start_secs: pair[0].elapsed.as_secs_f64(),
            end_secs: pair[1].elapsed.as_secs_f64(),
            count: pair[1].total.saturating_sub(pair[0].total),
        })
        .collect();
    bucket_units(&units, width)
}

/// Spreads `total` messages evenly over `duration`. Bucket counts always sum to `total`; past
/// [`MAX_BUCKETS`] windows the last bucket takes the rest.
pub fn bucket_uniform(total: u64, duration: Duration, width: Duration) -> Vec<IntervalBucket> {
    let w = width.as_secs_f64();
    if !(w > 0.0 && w.is_finite()) {
        return Vec::new();
    }

    let d = duration.as_secs_f64();
    if d <= 0.0 {
        return vec![IntervalBucket {
            start_secs: 0.0,
            end_secs: w,
            count: total,
        }];
    }

    // Message k is placed at (k + 0.5) * d / total; this counts those strictly before `t`.
    let before = |t: f64| -> u64 {
        if t >= d {
            return total;
        }
        let n = (t * total as f64 / d - 0.5).ceil();
        if n <= 0.0 {
            0
        } else {
            (n as u64).min(total)
        }
    };

    let n_buckets = ((d / w).ceil().min(MAX_BUCKETS as f64) as usize).max(1);
    let counts: Vec<u64> = (0..n_buckets)
        .map(|i| {
            let start = i as f64 * w;
            let end = if i + 1 == n_buckets { d } else { start + w };
            before(end).saturating_sub(before(start))
        })
        .collect();

    to_buckets(&counts, w)
}

fn to_buckets(counts: &[u64], w: f64) -> Vec<IntervalBucket> {
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| IntervalBucket {
            start_secs: i as f64 * w,
            end_secs: (i + 1) as f64 * w,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN: Duration = Duration::from_secs(10);

    #[test]
    fn midpoint_truncation_and_zero_fill() {
        let units = [
            WorkUnit {
                start_secs: 0.0,
                end_secs: 8.0,
                count: 3,
            },
            // midpoint 11 -> [10, 20)
            WorkUnit {
                start_secs: 8.0,
                end_secs: 14.0,
                count: 4,
            },
            WorkUnit {
                start_secs: 40.0,
                end_secs: 44.0,
                count: 1,
            },
        ];

        let buckets = bucket_units(&units, TEN);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![3, 4, 0, 0, 1]);
        assert_eq!(buckets[2].start_secs, 20.0);
        assert_eq!(buckets[2].end_secs, 30.0);
    }

    #[test]
    fn events_land_in_their_window() {
        let buckets = bucket_events(&[(0.0, 1), (9.99, 1), (10.0, 5), (25.0, 2)], TEN);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 5, 2]);
        assert!((buckets[1].rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cumulative_pairs_become_units() {
        let at = |s: u64, total: u64| CounterSample {
            elapsed: Duration::from_secs(s),
            total,
        };
        let buckets = bucket_cumulative(&[at(0, 0), at(4, 40), at(8, 100), at(12, 130)], TEN);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![100, 30]);
    }

    #[test]
    fn uniform_preserves_total() {
        for (total, secs) in [(1u64, 0.3f64), (7, 31.0), (1000, 29.9), (12_345, 95.5), (3, 100.0)] {
            let buckets = bucket_uniform(total, Duration::from_secs_f64(secs), TEN);
            assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), total, "{total}/{secs}");
            assert_eq!(buckets.len(), ((secs / 10.0).ceil() as usize).max(1));
        }
    }

    #[test]
    fn uniform_spreads_evenly() {
        let buckets = bucket_uniform(300, Duration::from_secs(30), TEN);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![100, 100, 100]);
    }

    #[test]
    fn far_offsets_are_ignored_not_allocated() {
        let buckets = bucket_events(&[(1.0e30, 1), (f64::MAX, 1), (5.0, 2)], TEN);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2]);

        let wide = bucket_units(
            &[WorkUnit {
                start_secs: -1.0e30,
                end_secs: 1.0e30,
                count: 7,
            }],
            TEN,
        );
        assert_eq!(wide.len(), MAX_BUCKETS);
        assert_eq!(wide[0].count, 7);
    }

    #[test]
    fn uniform_over_a_huge_duration_is_capped() {
        let buckets = bucket_uniform(1_000, Duration::from_secs(1_000_000_000_000), TEN);
        assert_eq!(buckets.len(), MAX_BUCKETS);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 1_000);
    }

    #[test]
    fn zero_width_yields_nothing() {
        assert!(bucket_uniform(5, TEN, Duration::ZERO).is_empty());
        assert!(bucket_events(&[(1.0, 1)], Duration::ZERO).is_empty());
    }
}
