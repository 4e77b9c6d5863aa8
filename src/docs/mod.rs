use utoipa::OpenApi;
use crate::models::*;
use crate::session::Role;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Session coordinator answers commands", body = ReadyResponse),
        (status = 503, description = "Session coordinator is unavailable", body = ReadyResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Current session state without the document bytes
#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
        (status = 503, description = "Session coordinator is unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_status_doc() {}

/// Raw bytes of the current document
#[utoipa::path(
    get,
    path = "/api/v1/session/document",
    responses(
        (status = 200, description = "Current document, served as application/pdf"),
        (status = 404, description = "No document loaded", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_document_doc() {}

/// Session counters and host resource usage
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 503, description = "Session coordinator is unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        session_status_doc,
        session_document_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            ErrorResponse,
            SessionStatusResponse,
            ParticipantInfo,
            DiagnosticsResponse,
            Role,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
