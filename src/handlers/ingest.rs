//! Reading ingestion handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::models::{IngestAccepted, IngestRequest};
use crate::pipeline::queue::EnqueueError;
use crate::{ApiError, ApiResult, AppState};

/// POST /api/v1/readings
///
/// Validates and enqueues one reading. 202 means accepted for scoring, not
/// scored; the returned id lets the producer correlate with downstream
/// results. A full queue answers 503 with a backpressure body so producers
/// can tell "back off and retry" apart from a real failure.
///
/// The Json extraction is taken as a Result so malformed bodies map to our
/// 400 instead of the extractor's default rejection.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IngestAccepted>)> {
    let Json(request) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let reading = request
        .into_reading(Utc::now())
        .map_err(ApiError::Validation)?;
    let id = reading.id;

    match state.pipeline.input.enqueue(reading) {
        Ok(()) => {
            state.pipeline.stats.record_accepted();
            tracing::debug!(%id, queued = state.pipeline.input.len(), "Reading accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(IngestAccepted {
                    status: "accepted",
                    id,
                }),
            ))
        }
        Err(EnqueueError::Full) => {
            state.pipeline.stats.record_rejected_backpressure();
            Err(ApiError::Backpressure)
        }
        Err(EnqueueError::Closed) => Err(ApiError::Unavailable),
    }
}
