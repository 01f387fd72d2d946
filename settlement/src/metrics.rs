//! Metrics collection for the settlement notifier
//!
//! - `banco_settlement_delivered_total` - Acknowledged notices
//! - `banco_settlement_failed_total` - Notices parked after exhaustion
//! - `banco_settlement_attempts` - Attempts per notice histogram

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Notifier metrics, owning their registry
#[derive(Clone)]
pub struct NotifierMetrics {
    /// Acknowledged notices
    pub delivered_total: IntCounter,

    /// Notices that exhausted their retry budget
    pub failed_total: IntCounter,

    /// Attempts needed per notice
    pub attempts: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl NotifierMetrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let delivered_total = IntCounter::with_opts(Opts::new(
            "banco_settlement_delivered_total",
            "Settlement notices acknowledged by the external API",
        ))?;
        registry.register(Box::new(delivered_total.clone()))?;

        let failed_total = IntCounter::with_opts(Opts::new(
            "banco_settlement_failed_total",
            "Settlement notices parked after exhausting retries",
        ))?;
        registry.register(Box::new(failed_total.clone()))?;

        let attempts = Histogram::with_opts(
            HistogramOpts::new(
                "banco_settlement_attempts",
                "Delivery attempts needed per settlement notice",
            )
            .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        )?;
        registry.register(Box::new(attempts.clone()))?;

        Ok(Self {
            delivered_total,
            failed_total,
            attempts,
            registry,
        })
    }
}

impl std::fmt::Debug for NotifierMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierMetrics")
            .field("delivered_total", &self.delivered_total.get())
            .field("failed_total", &self.failed_total.get())
            .finish()
    }
}
