//! Health check handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::SharedEventBroker;

#[derive(Clone)]
pub struct HealthState {
    pub broker: SharedEventBroker,
    pub started_at: Instant,
}

/// Service health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Streams that currently have at least one subscriber
    pub streams_with_subscribers: usize,
    pub active_subscriptions: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        streams_with_subscribers: state.broker.stream_count(),
        active_subscriptions: state.broker.total_subscriptions(),
    })
}
