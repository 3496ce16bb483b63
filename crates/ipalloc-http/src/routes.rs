//! Route definitions for the HTTP API.

use crate::AppState;
use crate::handlers;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// All API routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/devices/:ip",
            get(handlers::get_device).fallback(handlers::method_not_supported),
        )
        .route(
            "/addresses/assign",
            post(handlers::assign_address).fallback(handlers::method_not_supported),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
