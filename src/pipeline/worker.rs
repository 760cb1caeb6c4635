//! Scoring worker
//!
//! The single consumer of the input queue. Every reading is scored exactly
//! once; the verdict always lands in the rolling window, and delivery is
//! attempted via the output queue. The worker survives any classifier
//! failure and exits only when the input queue closes and drains.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::{Reading, ScoredResult};
use crate::pipeline::window::WindowEntry;
use crate::pipeline::Pipeline;

/// Runs until the input queue is closed and empty. Spawn as a task and
/// await the handle during shutdown to guarantee the drain finished.
pub async fn run(pipeline: Arc<Pipeline>) {
    info!("Scoring worker started");
    while let Some(reading) = pipeline.input.dequeue().await {
        score_one(&pipeline, reading);
    }
    info!("Scoring worker stopped, input queue drained");
}

fn score_one(pipeline: &Pipeline, reading: Reading) {
    let started = Instant::now();

    let outcome = match pipeline.classifier.score(&reading.features) {
        Ok(outcome) => outcome,
        Err(err) => {
            pipeline.stats.record_scoring_error();
            warn!(id = %reading.id, error = %err, "Discarding unscorable reading");
            return;
        }
    };

    let processing_ms = started.elapsed().as_secs_f64() * 1000.0;
    pipeline.window.record(WindowEntry {
        recorded_at: Utc::now(),
        is_anomaly: outcome.is_anomaly,
        processing_ms,
    });
    pipeline.stats.record_scored();

    let result = ScoredResult::new(
        reading,
        outcome.is_anomaly,
        outcome.probability,
        processing_ms,
    );
    debug!(
        id = %result.reading.id,
        is_anomaly = outcome.is_anomaly,
        processing_ms,
        "Reading scored"
    );

    if let Err(err) = pipeline.output.enqueue(result) {
        // The verdict stays in the window; only the delivery is lost.
        pipeline.stats.record_output_dropped();
        warn!(error = %err, "Output queue rejected scored result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{AnomalyClassifier, ScoreOutcome, ScoringError};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    /// Flags readings whose `spike` feature is positive and errors on
    /// readings carrying a `poison` feature.
    struct MarkerClassifier;

    impl AnomalyClassifier for MarkerClassifier {
        fn feature_names(&self) -> &[String] {
            &[]
        }

        fn score(&self, features: &BTreeMap<String, f64>) -> Result<ScoreOutcome, ScoringError> {
            if features.contains_key("poison") {
                return Err(ScoringError::Model("poisoned reading".to_string()));
            }
            let is_anomaly = features.get("spike").copied().unwrap_or(0.0) > 0.0;
            Ok(ScoreOutcome {
                is_anomaly,
                probability: Some(if is_anomaly { 0.9 } else { 0.1 }),
            })
        }
    }

    fn test_pipeline(input: usize, output: usize, window: usize) -> Arc<Pipeline> {
        let mut config = Config::from_env();
        config.input_queue_capacity = input;
        config.output_queue_capacity = output;
        config.health_window_size = window;
        Arc::new(Pipeline::new(&config, Arc::new(MarkerClassifier)))
    }

    fn reading(pairs: &[(&str, f64)]) -> Reading {
        Reading {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            features: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[tokio::test]
    async fn test_drains_input_then_exits() {
        let pipeline = test_pipeline(8, 8, 8);
        for _ in 0..3 {
            pipeline
                .input
                .enqueue(reading(&[("temperature", 1.0)]))
                .unwrap();
        }
        pipeline.input.close();

        run(pipeline.clone()).await;

        assert_eq!(pipeline.window.len(), 3);
        assert_eq!(pipeline.output.len(), 3);
        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.scored, 3);
        assert_eq!(counters.scoring_errors, 0);
    }

    #[tokio::test]
    async fn test_classifier_error_does_not_stop_worker() {
        let pipeline = test_pipeline(8, 8, 8);
        pipeline.input.enqueue(reading(&[("poison", 1.0)])).unwrap();
        pipeline
            .input
            .enqueue(reading(&[("temperature", 1.0)]))
            .unwrap();
        pipeline.input.close();

        run(pipeline.clone()).await;

        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.scoring_errors, 1);
        assert_eq!(counters.scored, 1);
        // The failed reading left no trace in the window or output queue.
        assert_eq!(pipeline.window.len(), 1);
        assert_eq!(pipeline.output.len(), 1);
    }

    #[tokio::test]
    async fn test_full_output_drops_delivery_but_keeps_verdict() {
        let pipeline = test_pipeline(8, 1, 8);
        pipeline.input.enqueue(reading(&[("spike", 1.0)])).unwrap();
        pipeline
            .input
            .enqueue(reading(&[("temperature", 1.0)]))
            .unwrap();
        pipeline.input.close();

        run(pipeline.clone()).await;

        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.scored, 2);
        assert_eq!(counters.output_dropped, 1);
        assert_eq!(pipeline.window.len(), 2);

        // FIFO means the surviving delivery is the first reading.
        let delivered = pipeline.output.dequeue().await.unwrap();
        assert!(delivered.is_anomaly);
    }

    #[tokio::test]
    async fn test_verdicts_drive_window_ratio() {
        let pipeline = test_pipeline(8, 8, 8);
        pipeline.input.enqueue(reading(&[("spike", 5.0)])).unwrap();
        pipeline
            .input
            .enqueue(reading(&[("temperature", 1.0)]))
            .unwrap();
        pipeline.input.close();

        run(pipeline.clone()).await;

        let aggregates = pipeline.window.aggregates().unwrap();
        assert_eq!(aggregates.anomaly_ratio, 50.0);
        assert_eq!(pipeline.stats.snapshot().accepted, 0);
    }
}
