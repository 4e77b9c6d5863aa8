use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::Role;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub display_name: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Current session state without the document bytes.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub has_document: bool,
    pub document_bytes: u64,
    pub document_version: u64,
    pub page: u32,
    pub revision: u64,
    pub participants: Vec<ParticipantInfo>,
}
