//! Downstream forwarder
//!
//! The single consumer of the output queue. Results leave in FIFO order:
//! the next item is not touched until the current one is delivered or
//! dropped after its retry budget. A slow downstream therefore backs up
//! the output queue instead of reordering results.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::ScoredResult;
use crate::pipeline::Pipeline;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("downstream returned status {0}")]
    Status(u16),
}

pub struct Forwarder {
    client: reqwest::Client,
    downstream_url: String,
    attempts: u32,
    initial_backoff: Duration,
    backoff_multiplier: f64,
}

impl Forwarder {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.delivery_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            downstream_url: config.downstream_url.clone(),
            attempts: config.delivery_retries.max(1),
            initial_backoff: Duration::from_millis(config.delivery_backoff_ms),
            backoff_multiplier: config.delivery_backoff_multiplier,
        })
    }

    /// Runs until the output queue is closed and empty. Spawn as a task and
    /// await the handle during shutdown.
    pub async fn run(self, pipeline: Arc<Pipeline>) {
        info!(url = %self.downstream_url, "Forwarder started");
        while let Some(result) = pipeline.output.dequeue().await {
            let id = result.reading.id;
            match self.deliver(&result).await {
                Ok(()) => {
                    pipeline.stats.record_delivered();
                    debug!(%id, "Result delivered");
                }
                Err(err) => {
                    pipeline.stats.record_delivery_failed();
                    warn!(%id, error = %err, "Dropping result, delivery attempts exhausted");
                }
            }
        }
        info!("Forwarder stopped, output queue drained");
    }

    /// One result, every configured attempt, exponential backoff between
    /// them. 2xx from downstream is the only success.
    async fn deliver(&self, result: &ScoredResult) -> Result<(), DeliveryError> {
        let mut wait = self.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.post(result).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.attempts => {
                    debug!(
                        id = %result.reading.id,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "Delivery attempt failed, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.mul_f64(self.backoff_multiplier);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post(&self, result: &ScoredResult) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.downstream_url)
            .json(result)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnomalyClassifier, ScoreOutcome, ScoringError};
    use crate::models::Reading;
    use axum::http::StatusCode;
    use axum::{routing::post, Json, Router};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    struct AlwaysNormal;

    impl AnomalyClassifier for AlwaysNormal {
        fn feature_names(&self) -> &[String] {
            &[]
        }

        fn score(&self, _: &BTreeMap<String, f64>) -> Result<ScoreOutcome, ScoringError> {
            Ok(ScoreOutcome {
                is_anomaly: false,
                probability: Some(0.1),
            })
        }
    }

    fn test_pipeline() -> Arc<Pipeline> {
        let mut config = Config::from_env();
        config.input_queue_capacity = 8;
        config.output_queue_capacity = 8;
        config.health_window_size = 8;
        Arc::new(Pipeline::new(&config, Arc::new(AlwaysNormal)))
    }

    fn scored(marker: f64) -> ScoredResult {
        let mut features = BTreeMap::new();
        features.insert("marker".to_string(), marker);
        let reading = Reading {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            features,
        };
        ScoredResult::new(reading, false, Some(0.1), 1.0)
    }

    fn forwarder_to(url: String, attempts: u32) -> Forwarder {
        let mut config = Config::from_env();
        config.downstream_url = url;
        config.delivery_retries = attempts;
        config.delivery_backoff_ms = 5;
        config.delivery_backoff_multiplier = 1.0;
        config.delivery_timeout_secs = 5;
        Forwarder::new(&config).unwrap()
    }

    /// Local collector that records every body it receives, answering with
    /// `fail_first` errors before switching to 200.
    async fn spawn_collector(
        fail_first: u32,
    ) -> (SocketAddr, Arc<Mutex<Vec<serde_json::Value>>>) {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let hits = Arc::new(AtomicU32::new(0));

        let app = Router::new().route(
            "/receive_data",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                let hits = hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < fail_first {
                        StatusCode::INTERNAL_SERVER_ERROR
                    } else {
                        sink.lock().push(body);
                        StatusCode::OK
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, received)
    }

    #[tokio::test]
    async fn test_delivers_in_fifo_order() {
        let (addr, received) = spawn_collector(0).await;
        let pipeline = test_pipeline();
        for marker in [1.0, 2.0, 3.0] {
            pipeline.output.enqueue(scored(marker)).unwrap();
        }
        pipeline.output.close();

        forwarder_to(format!("http://{}/receive_data", addr), 2)
            .run(pipeline.clone())
            .await;

        let markers: Vec<f64> = received
            .lock()
            .iter()
            .map(|body| body["features"]["marker"].as_f64().unwrap())
            .collect();
        assert_eq!(markers, vec![1.0, 2.0, 3.0]);

        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.delivered, 3);
        assert_eq!(counters.delivery_failed, 0);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let (addr, received) = spawn_collector(1).await;
        let pipeline = test_pipeline();
        pipeline.output.enqueue(scored(1.0)).unwrap();
        pipeline.output.close();

        forwarder_to(format!("http://{}/receive_data", addr), 3)
            .run(pipeline.clone())
            .await;

        assert_eq!(received.lock().len(), 1);
        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.delivered, 1);
        assert_eq!(counters.delivery_failed, 0);
    }

    #[tokio::test]
    async fn test_unreachable_downstream_drops_after_retries() {
        // Nothing listens on port 1, so every attempt is refused.
        let pipeline = test_pipeline();
        pipeline.output.enqueue(scored(1.0)).unwrap();
        pipeline.output.close();

        forwarder_to("http://127.0.0.1:1/receive_data".to_string(), 3)
            .run(pipeline.clone())
            .await;

        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.delivered, 0);
        assert_eq!(counters.delivery_failed, 1);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_block_the_next() {
        // First request fails and the single-attempt budget drops item one;
        // item two must still go out.
        let (addr, received) = spawn_collector(1).await;
        let pipeline = test_pipeline();
        pipeline.output.enqueue(scored(1.0)).unwrap();
        pipeline.output.enqueue(scored(2.0)).unwrap();
        pipeline.output.close();

        forwarder_to(format!("http://{}/receive_data", addr), 1)
            .run(pipeline.clone())
            .await;

        let markers: Vec<f64> = received
            .lock()
            .iter()
            .map(|body| body["features"]["marker"].as_f64().unwrap())
            .collect();
        assert_eq!(markers, vec![2.0]);

        let counters = pipeline.stats.snapshot();
        assert_eq!(counters.delivered, 1);
        assert_eq!(counters.delivery_failed, 1);
    }
}
