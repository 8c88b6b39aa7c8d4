//! Execution metrics collected from [`ExecutionEvent`]s.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use crate::exec::{CacheOutcome, ExecutionEvent, ExecutionListener};
use crate::mapping::StatementKind;

use super::histogram::LatencyHistogram;

const KINDS: usize = StatementKind::ALL.len();

#[derive(Debug, Default)]
struct StatementCounters {
    executions: AtomicU64,
    rows: AtomicU64,
    latency: LatencyHistogram,
}

/// Per-statement summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementMetrics {
    pub statement: String,
    pub executions: u64,
    pub rows: u64,
    pub mean_us: Option<u64>,
    pub p95_us: Option<u64>,
}

/// Collects execution counts, latencies and cache outcomes.
///
/// Subscribe it to a [`crate::SqlMap`] to have every execution recorded:
///
/// ```ignore
/// let metrics = new_shared_registry();
/// map.subscribe(metrics.clone());
/// ```
#[derive(Debug)]
pub struct MetricsRegistry {
    started_at: Instant,
    executions: AtomicU64,
    by_kind: [AtomicU64; KINDS],
    by_statement: DashMap<String, StatementCounters>,
    rows: AtomicU64,
    latency: LatencyHistogram,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            executions: AtomicU64::new(0),
            by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            by_statement: DashMap::new(),
            rows: AtomicU64::new(0),
            latency: LatencyHistogram::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Record one execution.
    pub fn record(&self, event: &ExecutionEvent) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.by_kind[kind_index(event.kind)].fetch_add(1, Ordering::Relaxed);
        self.rows.fetch_add(event.rows, Ordering::Relaxed);
        self.latency.observe_duration(event.elapsed);

        match event.cache {
            CacheOutcome::Hit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            CacheOutcome::Miss => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            CacheOutcome::Uncached => {}
        }

        let counters = self
            .by_statement
            .entry(event.statement.clone())
            .or_default();
        counters.executions.fetch_add(1, Ordering::Relaxed);
        counters.rows.fetch_add(event.rows, Ordering::Relaxed);
        counters.latency.observe_duration(event.elapsed);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn executions_of_kind(&self, kind: StatementKind) -> u64 {
        self.by_kind[kind_index(kind)].load(Ordering::Relaxed)
    }

    pub fn executions_of(&self, statement: &str) -> u64 {
        self.by_statement
            .get(statement)
            .map_or(0, |c| c.executions.load(Ordering::Relaxed))
    }

    /// Objects returned by queries plus rows affected by updates.
    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    pub fn latency(&self) -> &LatencyHistogram {
        &self.latency
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Hits over cache lookups, `None` before the first lookup.
    pub fn cache_hit_ratio(&self) -> Option<f64> {
        let hits = self.cache_hits();
        let total = hits + self.cache_misses();
        (total > 0).then(|| hits as f64 / total as f64)
    }

    /// Summaries of every executed statement, ordered by id.
    pub fn statements(&self) -> Vec<StatementMetrics> {
        let mut statements: Vec<StatementMetrics> = self
            .by_statement
            .iter()
            .map(|entry| StatementMetrics {
                statement: entry.key().clone(),
                executions: entry.executions.load(Ordering::Relaxed),
                rows: entry.rows.load(Ordering::Relaxed),
                mean_us: entry.latency.mean_us(),
                p95_us: entry.latency.p95(),
            })
            .collect();
        statements.sort_by(|a, b| a.statement.cmp(&b.statement));
        statements
    }

    /// Render in the Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_prometheus(&mut out);
        out
    }

    fn write_prometheus(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# HELP sqlmap_uptime_seconds Time since the registry was created")?;
        writeln!(out, "# TYPE sqlmap_uptime_seconds gauge")?;
        writeln!(out, "sqlmap_uptime_seconds {}", self.uptime_secs())?;

        writeln!(out, "# HELP sqlmap_executions_total Statement executions by kind")?;
        writeln!(out, "# TYPE sqlmap_executions_total counter")?;
        for kind in StatementKind::ALL {
            writeln!(
                out,
                "sqlmap_executions_total{{kind=\"{}\"}} {}",
                kind.as_str(),
                self.executions_of_kind(kind)
            )?;
        }

        writeln!(out, "# HELP sqlmap_statement_executions_total Executions per statement")?;
        writeln!(out, "# TYPE sqlmap_statement_executions_total counter")?;
        for statement in self.statements() {
            writeln!(
                out,
                "sqlmap_statement_executions_total{{statement=\"{}\"}} {}",
                escape_label(&statement.statement),
                statement.executions
            )?;
        }

        writeln!(out, "# HELP sqlmap_rows_total Rows returned or affected")?;
        writeln!(out, "# TYPE sqlmap_rows_total counter")?;
        writeln!(out, "sqlmap_rows_total {}", self.rows())?;

        writeln!(out, "# HELP sqlmap_execution_duration_us Execution latency in microseconds")?;
        writeln!(out, "# TYPE sqlmap_execution_duration_us histogram")?;
        for (bound, count) in self.latency.cumulative() {
            match bound {
                Some(bound) => writeln!(out, "sqlmap_execution_duration_us_bucket{{le=\"{}\"}} {}", bound, count)?,
                None => writeln!(out, "sqlmap_execution_duration_us_bucket{{le=\"+Inf\"}} {}", count)?,
            }
        }
        writeln!(out, "sqlmap_execution_duration_us_sum {}", self.latency.sum_us())?;
        writeln!(out, "sqlmap_execution_duration_us_count {}", self.latency.count())?;

        writeln!(out, "# HELP sqlmap_cache_lookups_total Cache lookups by outcome")?;
        writeln!(out, "# TYPE sqlmap_cache_lookups_total counter")?;
        writeln!(out, "sqlmap_cache_lookups_total{{outcome=\"hit\"}} {}", self.cache_hits())?;
        writeln!(out, "sqlmap_cache_lookups_total{{outcome=\"miss\"}} {}", self.cache_misses())?;
        Ok(())
    }

    pub fn reset(&self) {
        self.executions.store(0, Ordering::Relaxed);
        for count in &self.by_kind {
            count.store(0, Ordering::Relaxed);
        }
        self.by_statement.clear();
        self.rows.store(0, Ordering::Relaxed);
        self.latency.reset();
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionListener for MetricsRegistry {
    fn on_executed(&self, event: &ExecutionEvent) {
        self.record(event);
    }
}

/// Shared metrics registry handle.
pub type SharedMetricsRegistry = Arc<MetricsRegistry>;

pub fn new_shared_registry() -> SharedMetricsRegistry {
    Arc::new(MetricsRegistry::new())
}

fn kind_index(kind: StatementKind) -> usize {
    match kind {
        StatementKind::Select => 0,
        StatementKind::Insert => 1,
        StatementKind::Update => 2,
        StatementKind::Delete => 3,
        StatementKind::Procedure => 4,
    }
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
