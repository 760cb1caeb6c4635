//! Streaming scoring pipeline
//!
//! Readings flow: ingestion handler -> input queue -> scoring worker ->
//! {rolling window, output queue} -> forwarder -> downstream consumer.
//! This module owns the shared structures; `worker` and `forwarder` are the
//! two long-lived tasks that move data through them.

pub mod forwarder;
pub mod queue;
pub mod stats;
pub mod window;
pub mod worker;

use std::sync::Arc;

use crate::config::Config;
use crate::model::AnomalyClassifier;
use crate::models::{HealthSnapshot, QueueHealth, QueueStatus, Reading, ScoredResult, ServiceStatus};

use queue::BoundedQueue;
use stats::PipelineStats;
use window::RollingWindow;

/// Everything the pipeline stages share. One instance per process, handed
/// around in an `Arc` by the HTTP state, the worker, and the forwarder.
/// Shutdown order: close `input`, join the worker, close `output`, join the
/// forwarder.
pub struct Pipeline {
    pub input: BoundedQueue<Reading>,
    pub output: BoundedQueue<ScoredResult>,
    pub window: RollingWindow,
    pub stats: PipelineStats,
    pub classifier: Arc<dyn AnomalyClassifier>,
}

impl Pipeline {
    pub fn new(config: &Config, classifier: Arc<dyn AnomalyClassifier>) -> Self {
        Self {
            input: BoundedQueue::new(config.input_queue_capacity),
            output: BoundedQueue::new(config.output_queue_capacity),
            window: RollingWindow::new(config.health_window_size),
            stats: PipelineStats::new(),
            classifier,
        }
    }

    /// Assembles the health view. Each structure is snapshotted on its own
    /// lock; health is advisory, so cross-structure atomicity is not needed.
    pub fn health_snapshot(&self, degraded: f64, critical: f64) -> HealthSnapshot {
        let aggregates = self.window.aggregates();
        let status = if aggregates.is_some() {
            ServiceStatus::Ok
        } else {
            ServiceStatus::NoData
        };

        HealthSnapshot {
            status,
            input_queue: queue_health(&self.input, degraded, critical),
            output_queue: queue_health(&self.output, degraded, critical),
            window_len: aggregates.map(|a| a.len).unwrap_or(0),
            avg_processing_ms: aggregates.map(|a| a.avg_processing_ms),
            anomaly_ratio: aggregates.map(|a| a.anomaly_ratio),
            last_scored_at: aggregates.map(|a| a.last_scored_at),
            counters: self.stats.snapshot(),
        }
    }
}

fn queue_health<T>(queue: &BoundedQueue<T>, degraded: f64, critical: f64) -> QueueHealth {
    let len = queue.len();
    let capacity = queue.capacity();
    QueueHealth {
        len,
        capacity,
        status: QueueStatus::classify(len, capacity, degraded, critical),
    }
}
