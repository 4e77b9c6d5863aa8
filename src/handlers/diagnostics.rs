use crate::{AppState, models::{DiagnosticsResponse, ErrorResponse}};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::{error, info};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Session counters plus host CPU and memory usage
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {

    let stats = app_state.coordinator.stats().await.map_err(|e| {
        error!("Failed to collect session stats: {}", e);
        ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Participants: {}, Revision: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.participants.len(),
        stats.revision
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_participants: stats.participants.len() as u32,
            n_admins: stats.admins as u32,
            has_document: stats.has_document,
            document_bytes: stats.document_bytes as u64,
            document_version: stats.document_version,
            revision: stats.revision,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
