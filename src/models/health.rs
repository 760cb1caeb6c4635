//! Health snapshot model

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Overall service status. Queue pressure is reported per-queue and does not
/// flip the overall status; only an empty window does, because every health
/// aggregate is undefined until something has been scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Ok,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Ok,
    Degraded,
    Critical,
}

impl QueueStatus {
    /// Staged occupancy classification. `degraded` and `critical` are fill
    /// ratios in [0, 1] with degraded <= critical.
    pub fn classify(len: usize, capacity: usize, degraded: f64, critical: f64) -> Self {
        let occupancy = if capacity == 0 {
            1.0
        } else {
            len as f64 / capacity as f64
        };
        if occupancy >= critical {
            QueueStatus::Critical
        } else if occupancy >= degraded {
            QueueStatus::Degraded
        } else {
            QueueStatus::Ok
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueHealth {
    pub len: usize,
    pub capacity: usize,
    pub status: QueueStatus,
}

/// Monotonic pipeline counters, reported verbatim.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterSnapshot {
    pub accepted: u64,
    pub rejected_backpressure: u64,
    pub scored: u64,
    pub scoring_errors: u64,
    pub output_dropped: u64,
    pub delivered: u64,
    pub delivery_failed: u64,
}

/// Point-in-time view assembled by the health endpoint. Computed on demand,
/// never persisted. Aggregates are None until the first reading is scored.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: ServiceStatus,
    pub input_queue: QueueHealth,
    pub output_queue: QueueHealth,
    pub window_len: usize,
    pub avg_processing_ms: Option<f64>,
    /// Share of window entries flagged anomalous, as a percentage.
    pub anomaly_ratio: Option<f64>,
    pub last_scored_at: Option<DateTime<Utc>>,
    pub counters: CounterSnapshot,
}
