//! Health check handler

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{HealthSnapshot, ServiceStatus};
use crate::AppState;

/// GET /health
///
/// Always returns the full snapshot body. The status code carries the
/// overall state for probes that only look at codes: 200 once the pipeline
/// has scored something, 503 while there is no data yet. Queue pressure is
/// reported inside the body and does not change the code.
pub async fn snapshot(State(state): State<AppState>) -> (StatusCode, Json<HealthSnapshot>) {
    let snapshot = state.pipeline.health_snapshot(
        state.config.queue_degraded_threshold,
        state.config.queue_critical_threshold,
    );
    let code = match snapshot.status {
        ServiceStatus::Ok => StatusCode::OK,
        ServiceStatus::NoData => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{AnomalyClassifier, ScoreOutcome, ScoringError};
    use crate::pipeline::window::WindowEntry;
    use crate::pipeline::Pipeline;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Arc;

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

    fn test_state() -> AppState {
        let mut config = Config::from_env();
        config.input_queue_capacity = 8;
        config.output_queue_capacity = 8;
        config.health_window_size = 8;
        AppState {
            pipeline: Arc::new(Pipeline::new(&config, Arc::new(AlwaysNormal))),
            config,
        }
    }

    #[tokio::test]
    async fn test_no_data_is_503_with_body() {
        let state = test_state();
        let (code, Json(body)) = snapshot(State(state)).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, ServiceStatus::NoData);
        assert_eq!(body.window_len, 0);
        assert!(body.avg_processing_ms.is_none());
    }

    #[tokio::test]
    async fn test_scored_data_turns_200() {
        let state = test_state();
        state.pipeline.window.record(WindowEntry {
            recorded_at: Utc::now(),
            is_anomaly: true,
            processing_ms: 1.5,
        });

        let (code, Json(body)) = snapshot(State(state)).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, ServiceStatus::Ok);
        assert_eq!(body.window_len, 1);
        assert_eq!(body.anomaly_ratio, Some(100.0));
        assert_eq!(body.avg_processing_ms, Some(1.5));
    }
}
