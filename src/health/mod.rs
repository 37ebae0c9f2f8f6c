//! Health check endpoints

use crate::broker::RecordPublisher;
use crate::metrics::BridgeMetrics;
use crate::session::SessionState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub session: &'static str,
    pub broker_connected: bool,
    pub uptime_seconds: Option<u64>,
    pub messages_received: u64,
    pub records_forwarded: u64,
    pub forward_failures: u64,
    pub no_data_envelopes: u64,
    pub unparseable_frames: u64,
}

/// Application state for health endpoints
#[derive(Clone)]
pub struct AppState {
    pub session: SessionState,
    pub publisher: Arc<RecordPublisher>,
    pub metrics: Arc<BridgeMetrics>,
}

/// Create the health check router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint - returns 200 while the upstream session is
/// connected. Echo-only mode is a legitimate operating state: broker
/// connectivity is reported but does not gate readiness.
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.session.health();
    let is_ready = health.is_connected();

    let response = ReadyResponse {
        ready: is_ready,
        session: health.as_str(),
        broker_connected: state.publisher.is_connected(),
        uptime_seconds: state.session.uptime().map(|uptime| uptime.as_secs()),
        messages_received: state.session.messages_received(),
        records_forwarded: state.session.records_forwarded(),
        forward_failures: state.session.forward_failures(),
        no_data_envelopes: state.session.no_data_envelopes(),
        unparseable_frames: state.session.unparseable_frames(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    // Refresh status gauges at scrape time
    state.metrics.set_session_up(state.session.is_connected());
    state
        .metrics
        .set_broker_connected(state.publisher.is_connected());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}
