//! Lock-free latency histogram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Upper bounds of the finite buckets, in microseconds.
pub const BUCKET_BOUNDS_US: [u64; 12] = [
    50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 50_000, 250_000, 1_000_000, 10_000_000,
];

const BUCKETS: usize = BUCKET_BOUNDS_US.len() + 1;

/// Fixed-bucket histogram of execution latencies.
///
/// Observations above the last bound land in an overflow bucket. Quantiles
/// are reported as the upper bound of the bucket holding them.
#[derive(Debug)]
pub struct LatencyHistogram {
    counts: [AtomicU64; BUCKETS],
    count: AtomicU64,
    sum_us: AtomicU64,
    max_us: AtomicU64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            sum_us: AtomicU64::new(0),
            max_us: AtomicU64::new(0),
        }
    }

    pub fn observe_duration(&self, elapsed: Duration) {
        self.observe(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
    }

    /// Record one observation in microseconds.
    pub fn observe(&self, micros: u64) {
        let bucket = BUCKET_BOUNDS_US
            .iter()
            .position(|&bound| micros <= bound)
            .unwrap_or(BUCKETS - 1);
        self.counts[bucket].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(micros, Ordering::Relaxed);
        self.max_us.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_us(&self) -> u64 {
        self.sum_us.load(Ordering::Relaxed)
    }

    pub fn max_us(&self) -> u64 {
        self.max_us.load(Ordering::Relaxed)
    }

    pub fn mean_us(&self) -> Option<u64> {
        let count = self.count();
        (count > 0).then(|| self.sum_us() / count)
    }

    /// Approximate quantile `q` in `0.0..=1.0`. `None` before the first
    /// observation.
    ///
    /// The overflow bucket reports the largest observed value.
    pub fn quantile(&self, q: f64) -> Option<u64> {
        let total = self.count();
        if total == 0 {
            return None;
        }
        let rank = ((total as f64) * q.clamp(0.0, 1.0)).ceil().max(1.0) as u64;
        let mut seen = 0;
        for (i, count) in self.counts.iter().enumerate() {
            seen += count.load(Ordering::Relaxed);
            if seen >= rank {
                return Some(BUCKET_BOUNDS_US.get(i).copied().unwrap_or_else(|| self.max_us()));
            }
        }
        Some(self.max_us())
    }

    pub fn p50(&self) -> Option<u64> {
        self.quantile(0.50)
    }

    pub fn p95(&self) -> Option<u64> {
        self.quantile(0.95)
    }

    pub fn p99(&self) -> Option<u64> {
        self.quantile(0.99)
    }

    /// Cumulative `(upper bound, count)` pairs; the last pair has no bound.
    pub fn cumulative(&self) -> Vec<(Option<u64>, u64)> {
        let mut running = 0;
        self.counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                running += count.load(Ordering::Relaxed);
                (BUCKET_BOUNDS_US.get(i).copied(), running)
            })
            .collect()
    }

    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
        self.count.store(0, Ordering::Relaxed);
        self.sum_us.store(0, Ordering::Relaxed);
        self.max_us.store(0, Ordering::Relaxed);
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_and_summaries() {
        let histogram = LatencyHistogram::new();
        histogram.observe(40);
        histogram.observe(300);
        histogram.observe_duration(Duration::from_millis(2));

        assert_eq!(histogram.count(), 3);
        assert_eq!(histogram.sum_us(), 40 + 300 + 2_000);
        assert_eq!(histogram.max_us(), 2_000);
        assert_eq!(histogram.mean_us(), Some(780));
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = LatencyHistogram::new();
        assert_eq!(histogram.mean_us(), None);
        assert_eq!(histogram.p50(), None);
        assert_eq!(histogram.max_us(), 0);
    }

    #[test]
    fn test_quantiles_report_bucket_bounds() {
        let histogram = LatencyHistogram::new();
        for _ in 0..90 {
            histogram.observe(80);
        }
        for _ in 0..10 {
            histogram.observe(4_000);
        }
        assert_eq!(histogram.p50(), Some(100));
        assert_eq!(histogram.quantile(0.90), Some(100));
        assert_eq!(histogram.p95(), Some(5_000));
        assert_eq!(histogram.p99(), Some(5_000));
    }

    #[test]
    fn test_overflow_bucket_reports_max() {
        let histogram = LatencyHistogram::new();
        histogram.observe(30_000_000);
        assert_eq!(histogram.p50(), Some(30_000_000));
        let cumulative = histogram.cumulative();
        assert_eq!(cumulative.last(), Some(&(None, 1)));
        assert_eq!(cumulative[0], (Some(50), 0));
    }

    #[test]
    fn test_reset() {
        let histogram = LatencyHistogram::new();
        histogram.observe(10);
        histogram.reset();
        assert_eq!(histogram.count(), 0);
        assert_eq!(histogram.sum_us(), 0);
        assert!(histogram.cumulative().iter().all(|(_, n)| *n == 0));
    }
}
