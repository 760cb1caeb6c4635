//! Pipeline counters
//!
//! Monotonic process-lifetime counters, incremented from whichever task owns
//! the event and read by the health endpoint. Relaxed ordering is fine: each
//! counter is independent and health only needs eventually-current values.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::CounterSnapshot;

#[derive(Debug, Default)]
pub struct PipelineStats {
    accepted: AtomicU64,
    rejected_backpressure: AtomicU64,
    scored: AtomicU64,
    scoring_errors: AtomicU64,
    output_dropped: AtomicU64,
    delivered: AtomicU64,
    delivery_failed: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_backpressure(&self) {
        self.rejected_backpressure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scored(&self) {
        self.scored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scoring_error(&self) {
        self.scoring_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_output_dropped(&self) {
        self.output_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failed(&self) {
        self.delivery_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_backpressure: self.rejected_backpressure.load(Ordering::Relaxed),
            scored: self.scored.load(Ordering::Relaxed),
            scoring_errors: self.scoring_errors.load(Ordering::Relaxed),
            output_dropped: self.output_dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failed: self.delivery_failed.load(Ordering::Relaxed),
        }
    }
}
