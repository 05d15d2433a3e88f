//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/audit/page", post(handlers::audit_page))
        .route("/audit/crawl", post(handlers::audit_crawl))
        .route("/report/export", post(handlers::export_report))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
