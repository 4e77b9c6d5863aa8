use crate::{
    AppState,
    handlers::{diagnostics, health_check, ready_check, session_document, session_status},
};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes() -> Router<Arc<AppState>> {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/session", get(session_status))
        .route("/v1/session/document", get(session_document))
        .route("/v1/diagnostics", get(diagnostics))
}
