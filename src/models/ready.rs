use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for the readiness check. Ready means the session coordinator answers commands.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    pub status: String,
    pub message: String,
    pub coordinator: bool,
}
