//! Pull-based metrics exposition:
//! - `GET /metrics`: Prometheus text format
//! - `GET /api/stats`: the same counters as JSON
//! - `GET /health`: liveness

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use bridge_engine::Metrics;

#[derive(Clone)]
struct AppState {
    metrics: Arc<Metrics>,
}

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/api/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .with_state(AppState { metrics })
}

/// Claim the API port. Done before anything else starts so a taken port
/// stops the daemon instead of leaving it running without `/metrics`.
pub async fn bind(port: u16) -> Result<TcpListener, String> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "metrics server listening");
    Ok(listener)
}

/// Serve on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry().gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buf).into_response()
}

async fn handle_stats(State(state): State<AppState>) -> Response {
    axum::Json(state.metrics.snapshot()).into_response()
}

async fn handle_health() -> &'static str {
    "OK"
}
