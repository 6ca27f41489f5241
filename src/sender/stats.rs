// Lock-free dispatch counters, updated by the consumption loop and read
// from any thread.

use super::response::BulkOutcome;
use super::transmission::TransmissionResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct DispatchStats {
    batches_dispatched: AtomicU64,
    items_dispatched: AtomicU64,
    bytes_sent: AtomicU64,
    batches_accepted: AtomicU64,
    partial_failures: AtomicU64,
    batches_rejected: AtomicU64,
    transport_failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStatsSnapshot {
    pub batches_dispatched: u64,
    pub items_dispatched: u64,
    pub bytes_sent: u64,
    pub batches_accepted: u64,
    pub partial_failures: u64,
    pub batches_rejected: u64,
    pub transport_failures: u64,
    pub average_latency: Duration,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_result(&self, result: &TransmissionResult) {
        self.record_attempt(result.item_count, result.latency);
        self.bytes_sent
            .fetch_add(result.bytes_sent as u64, Ordering::Relaxed);

        let counter = match result.outcome {
            BulkOutcome::Accepted { .. } => &self.batches_accepted,
            BulkOutcome::PartialFailure { .. } => &self.partial_failures,
            BulkOutcome::Rejected { .. } => &self.batches_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self, item_count: usize, latency: Duration) {
        self.record_attempt(item_count, latency);
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_attempt(&self, item_count: usize, latency: Duration) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.items_dispatched
            .fetch_add(item_count as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        let batches_dispatched = self.batches_dispatched.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let average_latency = if batches_dispatched > 0 {
            Duration::from_millis(total_latency_ms / batches_dispatched)
        } else {
            Duration::ZERO
        };

        DispatchStatsSnapshot {
            batches_dispatched,
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            batches_accepted: self.batches_accepted.load(Ordering::Relaxed),
            partial_failures: self.partial_failures.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            average_latency,
        }
    }
}
