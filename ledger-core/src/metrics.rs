//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_postings_total` - Transaction rows committed
//! - `ledger_transitions_total` - Approve/reject transitions applied
//! - `ledger_guard_rejections_total` - Guarded commits rejected for insufficient balance
//! - `ledger_commit_duration_seconds` - Histogram of commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Registers into its own `Registry` so repeated construction (one per
/// ledger instance, many per test run) never collides.
#[derive(Clone)]
pub struct Metrics {
    /// Transaction rows committed
    pub postings_total: IntCounter,

    /// Approve/reject transitions applied
    pub transitions_total: IntCounter,

    /// Guarded commits rejected for insufficient balance
    pub guard_rejections_total: IntCounter,

    /// Commit latency histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let postings_total = IntCounter::with_opts(Opts::new(
            "ledger_postings_total",
            "Transaction rows committed",
        ))?;
        registry.register(Box::new(postings_total.clone()))?;

        let transitions_total = IntCounter::with_opts(Opts::new(
            "ledger_transitions_total",
            "Approve/reject transitions applied",
        ))?;
        registry.register(Box::new(transitions_total.clone()))?;

        let guard_rejections_total = IntCounter::with_opts(Opts::new(
            "ledger_guard_rejections_total",
            "Guarded commits rejected for insufficient balance",
        ))?;
        registry.register(Box::new(guard_rejections_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            postings_total,
            transitions_total,
            guard_rejections_total,
            commit_duration,
            registry,
        })
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("postings_total", &self.postings_total.get())
            .field("transitions_total", &self.transitions_total.get())
            .field("guard_rejections_total", &self.guard_rejections_total.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();

        a.postings_total.inc();
        assert_eq!(a.postings_total.get(), 1);
        assert_eq!(b.postings_total.get(), 0);
    }
}
