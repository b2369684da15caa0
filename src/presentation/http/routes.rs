//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, logging::track_metrics};
use crate::presentation::websocket::stream_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes (all protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(chat_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Chat routes
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/chats",
            get(handlers::chat::list_chats).post(handlers::chat::create_chat),
        )
        .route(
            "/chats/{chat_id}",
            get(handlers::chat::get_chat).patch(handlers::chat::update_chat),
        )
        .route(
            "/chats/{chat_id}/messages",
            get(handlers::message::get_messages).post(handlers::message::post_message),
        )
        .route("/chats/{chat_id}/members", post(handlers::chat::add_member))
        .route(
            "/chats/{chat_id}/members/{user_id}",
            patch(handlers::chat::change_member_role),
        )
        .route("/chats/{chat_id}/stream", get(stream_handler))
}
