use serde::Serialize;

use crate::config::LoadConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPlan {
    pub worker_id: u64,
    pub destination_id: u64,
    pub share: u64,
}

/// Splits the run's volume across workers.
///
/// Every worker gets `total / workers` messages and the last one also takes the remainder.
/// Destinations are assigned round-robin (`worker_id mod destinations + 1`), so coverage is
/// even regardless of the worker/destination ratio.
pub fn plan_workers(cfg: &LoadConfig) -> Result<Vec<WorkerPlan>> {
    cfg.validate()?;

    let base = cfg.total_messages / cfg.workers;
    let remainder = cfg.total_messages % cfg.workers;

    let plans = (0..cfg.workers)
        .map(|worker_id| {
            let is_last = worker_id + 1 == cfg.workers;
            WorkerPlan {
                worker_id,
                destination_id: (worker_id % cfg.destinations) + 1,
                share: if is_last { base + remainder } else { base },
            }
        })
        .collect();

    Ok(plans)
}
