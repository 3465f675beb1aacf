//! Dispatch metrics with lock-free atomic counters.
//!
//! [`DispatchMetrics`] is updated from the consume loop and the publish
//! path and queried from anywhere via [`DispatchMetrics::snapshot`]. This
//! is where [`DeliveryOutcome`](crate::dispatch::DeliveryOutcome) totals
//! surface to the observability layer; the bus persists nothing itself.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the publish and dispatch paths.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Envelopes acknowledged by the broker.
    pub published_total: AtomicU64,
    /// Publishes rejected by validation before any network call.
    pub publish_rejected_total: AtomicU64,
    /// Publishes that reached the transport and failed.
    pub publish_failed_total: AtomicU64,
    /// Inbound messages processed successfully.
    pub processed_total: AtomicU64,
    /// Inbound messages whose handler failed.
    pub handler_failed_total: AtomicU64,
    /// Inbound messages that failed decoding or validation.
    pub validation_failed_total: AtomicU64,
    /// Inbound messages dropped: no handler, or topic outside the catalogue.
    pub dropped_total: AtomicU64,
    /// Failure records handed to the dead-letter writer.
    pub dead_lettered_total: AtomicU64,
}

impl DispatchMetrics {
    /// Creates new zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an immutable snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            published_total: self.published_total.load(Ordering::Relaxed),
            publish_rejected_total: self.publish_rejected_total.load(Ordering::Relaxed),
            publish_failed_total: self.publish_failed_total.load(Ordering::Relaxed),
            processed_total: self.processed_total.load(Ordering::Relaxed),
            handler_failed_total: self.handler_failed_total.load(Ordering::Relaxed),
            validation_failed_total: self.validation_failed_total.load(Ordering::Relaxed),
            dropped_total: self.dropped_total.load(Ordering::Relaxed),
            dead_lettered_total: self.dead_lettered_total.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of dispatch metrics for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchMetricsSnapshot {
    /// Envelopes acknowledged by the broker.
    pub published_total: u64,
    /// Publishes rejected by validation before any network call.
    pub publish_rejected_total: u64,
    /// Publishes that reached the transport and failed.
    pub publish_failed_total: u64,
    /// Inbound messages processed successfully.
    pub processed_total: u64,
    /// Inbound messages whose handler failed.
    pub handler_failed_total: u64,
    /// Inbound messages that failed decoding or validation.
    pub validation_failed_total: u64,
    /// Inbound messages dropped: no handler, or topic outside the catalogue.
    pub dropped_total: u64,
    /// Failure records handed to the dead-letter writer.
    pub dead_lettered_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let snapshot = DispatchMetrics::new().snapshot();
        assert_eq!(snapshot, DispatchMetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = DispatchMetrics::new();
        metrics.processed_total.fetch_add(3, Ordering::Relaxed);
        metrics.handler_failed_total.fetch_add(1, Ordering::Relaxed);
        metrics.dead_lettered_total.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed_total, 3);
        assert_eq!(snapshot.handler_failed_total, 1);
        assert_eq!(snapshot.dead_lettered_total, 1);
        assert_eq!(snapshot.published_total, 0);
    }
}
