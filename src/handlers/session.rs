use crate::{AppState, models::{ErrorResponse, SessionStatusResponse}};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::error;

/// Current page, document metadata and participants, without the document itself
pub async fn session_status(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionStatusResponse>), (StatusCode, Json<ErrorResponse>)> {
    let stats = app_state.coordinator.stats().await.map_err(|e| {
        error!("Failed to read session status: {}", e);
        ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(SessionStatusResponse {
            has_document: stats.has_document,
            document_bytes: stats.document_bytes as u64,
            document_version: stats.document_version,
            page: stats.page,
            revision: stats.revision,
            participants: stats.participants,
        }),
    ))
}

/// Raw bytes of the current document
pub async fn session_document(
    State(app_state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = app_state.coordinator.request_snapshot().await.map_err(|e| {
        error!("Failed to read session document: {}", e);
        ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    match snapshot.document {
        Some(document) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            document.to_vec(),
        )
            .into_response()),
        None => Err(ErrorResponse::reply(StatusCode::NOT_FOUND, "No document loaded")),
    }
}
