//! Streaming anomaly scoring service
//!
//! Accepts sensor readings over HTTP, scores each against a pre-trained
//! one-class SVM, and forwards scored results to a downstream consumer.
//!
//! # Architecture
//!
//! ```text
//!  producers ──POST /api/v1/readings──┐
//!                                     ▼
//!                              ┌─────────────┐     ┌────────────────┐
//!                              │ input queue │────▶│ scoring worker │
//!                              └─────────────┘     └───────┬────────┘
//!                                              verdicts    │    results
//!                                          ┌───────────────┴───────┐
//!                                          ▼                       ▼
//!                                 ┌────────────────┐      ┌──────────────┐
//!                                 │ rolling window │      │ output queue │
//!                                 └────────┬───────┘      └──────┬───────┘
//!                                          │                     ▼
//!  GET /health ◀─── queues + counters ─────┘              ┌───────────┐
//!                                                         │ forwarder │──POST──▶ downstream
//!                                                         └───────────┘
//! ```
//!
//! Queues are bounded and enqueue fails fast: overload surfaces to the
//! producer as backpressure within one request, never as silent loss.

mod config;
mod error;
mod handlers;
mod model;
mod models;
mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use model::{AnomalyClassifier, OcsvmModel};
use pipeline::forwarder::Forwarder;
use pipeline::{worker, Pipeline};

pub use error::{ApiError, ApiResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anomaly_stream=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    tracing::info!("Anomaly scoring service starting...");

    // Load the classifier; a service without a model cannot score anything,
    // so this is the one fatal path.
    let model = OcsvmModel::from_file(&config.model_path)
        .with_context(|| format!("loading model from {}", config.model_path))?;
    tracing::info!(
        features = model.feature_names().len(),
        support_vectors = model.support_vector_count(),
        "Loaded one-class SVM model"
    );

    let pipeline = Arc::new(Pipeline::new(&config, Arc::new(model)));
    let forwarder = Forwarder::new(&config).context("building downstream HTTP client")?;

    // Long-lived tasks: one scoring worker, one forwarder.
    let worker_handle = tokio::spawn(worker::run(pipeline.clone()));
    let forwarder_handle = tokio::spawn(forwarder.run(pipeline.clone()));

    // Build router
    let state = AppState {
        pipeline: pipeline.clone(),
        config: config.clone(),
    };
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Drain in pipeline order: stop intake, let the worker finish scoring
    // everything buffered, then let the forwarder flush deliveries.
    tracing::info!("Shutting down, draining pipeline");
    pipeline.input.close();
    if let Err(err) = worker_handle.await {
        tracing::error!(error = %err, "Scoring worker task failed");
    }
    pipeline.output.close();
    if let Err(err) = forwarder_handle.await {
        tracing::error!(error = %err, "Forwarder task failed");
    }

    let counters = pipeline.stats.snapshot();
    tracing::info!(
        scored = counters.scored,
        delivered = counters.delivered,
        delivery_failed = counters.delivery_failed,
        "Pipeline drained, exiting"
    );

    serve_result.context("server error")?;
    Ok(())
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::snapshot))
        .route("/api/v1/readings", post(handlers::ingest::submit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
