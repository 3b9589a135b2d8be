//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/chat", chat_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
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

/// Chat routes (protected).
///
/// Both `/messages/{id}` routes share one parameter name: it is the other
/// participant for history and the message for read receipts.
fn chat_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::chat::send_message))
        .route(
            "/messages/{id}",
            get(handlers::chat::get_conversation_messages),
        )
        .route(
            "/messages/{id}/read",
            post(handlers::chat::mark_message_as_read),
        )
        .route(
            "/conversations",
            get(handlers::chat::get_user_conversations),
        )
        .route("/ws", get(ws_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
