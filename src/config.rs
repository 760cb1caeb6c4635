//! Service configuration loaded from environment variables.
//!
//! Every knob has a default that matches how the service is deployed in
//! the lab, so `cargo run` with a model file present just works.

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port for the HTTP server.
    pub port: u16,

    /// Path to the exported one-class SVM parameters (JSON).
    pub model_path: String,

    /// Capacity of the ingestion queue. Enqueue past this fails fast.
    pub input_queue_capacity: usize,
    /// Capacity of the delivery queue feeding the forwarder.
    pub output_queue_capacity: usize,
    /// Number of recent results retained for health aggregates.
    pub health_window_size: usize,

    /// Where scored results get POSTed.
    pub downstream_url: String,
    /// Delivery attempts per result before it is dropped.
    pub delivery_retries: u32,
    /// Initial wait between delivery attempts.
    pub delivery_backoff_ms: u64,
    /// Backoff growth factor between attempts.
    pub delivery_backoff_multiplier: f64,
    /// Per-request timeout for downstream POSTs.
    pub delivery_timeout_secs: u64,

    /// Queue fill ratio at which health reports "degraded".
    pub queue_degraded_threshold: f64,
    /// Queue fill ratio at which health reports "critical".
    pub queue_critical_threshold: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 5001),
            model_path: env::var("MODEL_PATH").unwrap_or_else(|_| "ocsvm_model.json".to_string()),
            input_queue_capacity: env_parse("INPUT_QUEUE_CAPACITY", 1000),
            output_queue_capacity: env_parse("OUTPUT_QUEUE_CAPACITY", 1000),
            health_window_size: env_parse("HEALTH_WINDOW_SIZE", 1000),
            downstream_url: env::var("DOWNSTREAM_URL")
                .unwrap_or_else(|_| "http://localhost:5002/receive_data".to_string()),
            delivery_retries: env_parse("DELIVERY_RETRIES", 5),
            delivery_backoff_ms: env_parse("DELIVERY_BACKOFF_MS", 2000),
            delivery_backoff_multiplier: env_parse("DELIVERY_BACKOFF_MULTIPLIER", 2.0),
            delivery_timeout_secs: env_parse("DELIVERY_TIMEOUT_SECS", 10),
            queue_degraded_threshold: env_parse("QUEUE_DEGRADED_THRESHOLD", 0.8),
            queue_critical_threshold: env_parse("QUEUE_CRITICAL_THRESHOLD", 0.95),
        }
    }

    /// Rejects configurations that would wedge the pipeline at startup
    /// rather than letting them fail confusingly at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_queue_capacity == 0 {
            return Err("INPUT_QUEUE_CAPACITY must be at least 1".to_string());
        }
        if self.output_queue_capacity == 0 {
            return Err("OUTPUT_QUEUE_CAPACITY must be at least 1".to_string());
        }
        if self.health_window_size == 0 {
            return Err("HEALTH_WINDOW_SIZE must be at least 1".to_string());
        }
        if self.delivery_backoff_multiplier < 1.0 {
            return Err("DELIVERY_BACKOFF_MULTIPLIER must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.queue_degraded_threshold)
            || !(0.0..=1.0).contains(&self.queue_critical_threshold)
        {
            return Err("queue thresholds must be within [0.0, 1.0]".to_string());
        }
        if self.queue_degraded_threshold > self.queue_critical_threshold {
            return Err(
                "QUEUE_DEGRADED_THRESHOLD must not exceed QUEUE_CRITICAL_THRESHOLD".to_string(),
            );
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
