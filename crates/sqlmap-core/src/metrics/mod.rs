//! Execution metrics.
//!
//! [`MetricsRegistry`] is an [`crate::ExecutionListener`]: subscribe it to a
//! [`crate::SqlMap`] and it keeps per-statement execution counts, counts by
//! statement kind, returned rows, latency percentiles and cache hit/miss
//! totals, exportable in the Prometheus text format.

mod histogram;
mod registry;

pub use histogram::{LatencyHistogram, BUCKET_BOUNDS_US};
pub use registry::{new_shared_registry, MetricsRegistry, SharedMetricsRegistry, StatementMetrics};
