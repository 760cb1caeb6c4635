//! Rolling health window
//!
//! Keeps the outcome and timing of the most recent scorings so the health
//! endpoint can report averages over "recent" work rather than all time.
//! Only successfully scored readings enter the window.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Compact per-reading sample. The reading itself is not retained.
#[derive(Debug, Clone, Copy)]
pub struct WindowEntry {
    pub recorded_at: DateTime<Utc>,
    pub is_anomaly: bool,
    pub processing_ms: f64,
}

/// Aggregates over the current window contents.
#[derive(Debug, Clone, Copy)]
pub struct WindowAggregates {
    pub len: usize,
    pub avg_processing_ms: f64,
    /// Percentage of entries flagged anomalous.
    pub anomaly_ratio: f64,
    pub last_scored_at: DateTime<Utc>,
}

/// Fixed-capacity FIFO of recent scoring outcomes. The scoring worker is
/// the only writer; the health endpoint takes short read locks.
pub struct RollingWindow {
    entries: RwLock<VecDeque<WindowEntry>>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest when the window is full.
    pub fn record(&self, entry: WindowEntry) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Computes all health aggregates under one read guard so they describe
    /// a single consistent view. None while the window is empty.
    pub fn aggregates(&self) -> Option<WindowAggregates> {
        let entries = self.entries.read();
        let last = entries.back()?;

        let len = entries.len();
        let anomalies = entries.iter().filter(|e| e.is_anomaly).count();
        let total_ms: f64 = entries.iter().map(|e| e.processing_ms).sum();

        Some(WindowAggregates {
            len,
            avg_processing_ms: total_ms / len as f64,
            anomaly_ratio: anomalies as f64 / len as f64 * 100.0,
            last_scored_at: last.recorded_at,
        })
    }
}
