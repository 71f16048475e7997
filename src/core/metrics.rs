//! Dispatch metrics for observability
//!
//! Counters over the façade's lifetime: how many records went out, how
//! many were suppressed, and how sinks fared.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the unified logger and its sinks
///
/// # Example
///
/// ```
/// use unified_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_delivery();
/// metrics.record_sink_failure();
///
/// assert_eq!(metrics.deliveries(), 1);
/// assert_eq!(metrics.failure_rate(), 50.0);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to at least the sink filtering stage
    dispatched: AtomicU64,

    /// Records dropped by the global level or a filter pattern
    suppressed: AtomicU64,

    /// Successful `emit` calls across all sinks
    deliveries: AtomicU64,

    /// Failed `emit` calls across all sinks
    sink_failures: AtomicU64,

    /// Extra webhook attempts after a failed first try
    webhook_retries: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            webhook_retries: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn webhook_retries(&self) -> u64 {
        self.webhook_retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_suppressed(&self) -> u64 {
        self.suppressed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivery(&self) -> u64 {
        self.deliveries.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_webhook_retry(&self) -> u64 {
        self.webhook_retries.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed sink attempts as a percentage of all attempts (0.0 - 100.0)
    pub fn failure_rate(&self) -> f64 {
        let failed = self.sink_failures() as f64;
        let total = self.deliveries() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.suppressed.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.webhook_retries.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched()),
            suppressed: AtomicU64::new(self.suppressed()),
            deliveries: AtomicU64::new(self.deliveries()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            webhook_retries: AtomicU64::new(self.webhook_retries()),
        }
    }
}
