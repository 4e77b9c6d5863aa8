use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json};
use crate::AppState;
use crate::models::{HealthResponse, ReadyResponse};
use tracing::{debug, warn};

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        service: app_state.config.service_name.clone(),
    })
}

/// Readiness check endpoint: the session coordinator must answer a command.
pub async fn ready_check(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    debug!("Readiness check requested");
    match app_state.coordinator.stats().await {
        Ok(_) => (StatusCode::OK, Json(ReadyResponse {
            status: "ok".to_string(),
            message: "Service is ready".to_string(),
            coordinator: true,
        })),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(ReadyResponse {
                status: "unavailable".to_string(),
                message: e.to_string(),
                coordinator: false,
            }))
        }
    }
}
