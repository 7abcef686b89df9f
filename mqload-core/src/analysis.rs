mod bucket;
mod latency;
mod report;
mod stability;

pub use bucket::{
    IntervalBucket, MAX_BUCKETS, WorkUnit, bucket_cumulative, bucket_events, bucket_uniform,
    bucket_units,
};
pub use latency::{LatencySummary, percentile, summarize_latencies};
pub use report::{AnalysisInput, AnalysisReport, BucketRate, ThroughputSummary, analyze};
pub use stability::{
    DegradationCheck, PoolStability, StabilitySection, StabilityWindow, stability_section,
};
