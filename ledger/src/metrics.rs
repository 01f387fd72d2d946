//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the engine:
//!
//! - `banco_transactions_applied_total` - Applied transactions
//! - `banco_transactions_rejected_total` - Validation rejections
//! - `banco_transactions_failed_total` - Contention/storage failures
//! - `banco_conflict_retries_total` - Optimistic-concurrency retries
//! - `banco_submit_duration_seconds` - Submit latency histogram

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Owns its registry so that independent engines (and tests) can each
/// hold their own instance without collisions.
#[derive(Clone)]
pub struct Metrics {
    /// Applied transactions
    pub applied_total: IntCounter,

    /// Rejected transactions
    pub rejected_total: IntCounter,

    /// Failed transactions
    pub failed_total: IntCounter,

    /// Conflict retries
    pub conflict_retries_total: IntCounter,

    /// Submit latency histogram
    pub submit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let applied_total = IntCounter::with_opts(Opts::new(
            "banco_transactions_applied_total",
            "Applied transactions",
        ))?;
        registry.register(Box::new(applied_total.clone()))?;

        let rejected_total = IntCounter::with_opts(Opts::new(
            "banco_transactions_rejected_total",
            "Transactions rejected by validation",
        ))?;
        registry.register(Box::new(rejected_total.clone()))?;

        let failed_total = IntCounter::with_opts(Opts::new(
            "banco_transactions_failed_total",
            "Transactions failed on contention or storage errors",
        ))?;
        registry.register(Box::new(failed_total.clone()))?;

        let conflict_retries_total = IntCounter::with_opts(Opts::new(
            "banco_conflict_retries_total",
            "Optimistic-concurrency conflicts retried",
        ))?;
        registry.register(Box::new(conflict_retries_total.clone()))?;

        let submit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "banco_submit_duration_seconds",
                "Histogram of submit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(submit_duration.clone()))?;

        Ok(Self {
            applied_total,
            rejected_total,
            failed_total,
            conflict_retries_total,
            submit_duration,
            registry,
        })
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("applied_total", &self.applied_total.get())
            .field("rejected_total", &self.rejected_total.get())
            .field("failed_total", &self.failed_total.get())
            .field("conflict_retries_total", &self.conflict_retries_total.get())
            .finish()
    }
}
