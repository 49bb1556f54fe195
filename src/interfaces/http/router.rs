//! API router and OpenAPI document

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::{middleware, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::modules::health::{self, HealthResponse, HealthState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use super::modules::streams::{self, StreamsState};
use crate::interfaces::gateway::StreamGateway;
use crate::interfaces::ws::{
    ws_bidirectional_handler, ws_publish_handler, ws_subscribe_handler, StreamingState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        streams::create_stream,
        streams::list_streams,
        streams::get_stream,
        streams::update_stream,
        streams::delete_stream,
        streams::list_events,
    ),
    components(
        schemas(
            HealthResponse,
            streams::StreamDto,
            streams::CreateStreamRequest,
            streams::UpdateStreamRequest,
            streams::DataEventDto,
            streams::DeleteStreamResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and subscription counts"),
        (name = "Streams", description = "Stream lifecycle and stored events. Live delivery and \
            streaming publish use the WebSocket endpoints /ws/streams/{id}/subscribe, \
            /ws/publish and /ws/bidirectional"),
    ),
    info(
        title = "Datastream Broker API",
        version = "0.1.0",
        description = "Stream management and real-time event fanout"
    )
)]
pub struct ApiDoc;

/// Everything the router needs from the running service
pub struct RouterDeps {
    pub gateway: Arc<StreamGateway>,
    /// `None` disables `GET /metrics`
    pub prometheus: Option<PrometheusHandle>,
    pub started_at: Instant,
}

pub fn create_api_router(deps: RouterDeps) -> Router {
    let stream_routes = Router::new()
        .route(
            "/api/v1/streams",
            get(streams::list_streams).post(streams::create_stream),
        )
        .route(
            "/api/v1/streams/{id}",
            get(streams::get_stream)
                .patch(streams::update_stream)
                .delete(streams::delete_stream),
        )
        .route("/api/v1/streams/{id}/events", get(streams::list_events))
        .with_state(StreamsState {
            gateway: deps.gateway.clone(),
        });

    let ws_routes = Router::new()
        .route("/ws/streams/{id}/subscribe", get(ws_subscribe_handler))
        .route("/ws/publish", get(ws_publish_handler))
        .route("/ws/bidirectional", get(ws_bidirectional_handler))
        .with_state(StreamingState {
            gateway: deps.gateway.clone(),
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(HealthState {
            broker: deps.gateway.broker().clone(),
            started_at: deps.started_at,
        });

    let mut router = Router::new()
        .merge(stream_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    if let Some(handle) = deps.prometheus {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
}
