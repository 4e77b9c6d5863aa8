use serde::{Deserialize, Serialize};
use serde_with::{serde_as, base64::Base64};

use crate::session::{DocumentBytes, Role};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginMessage {
    pub display_name: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentMessage {
    #[serde_as(as = "Base64")]
    pub document: DocumentBytes,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangePageMessage {
    pub page: i64,
    pub display_name: String,
}

/// Messages sent by a client over the session socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "login")]
    Login(LoginMessage),
    #[serde(rename = "requestSnapshot")]
    RequestSnapshot,
    #[serde(rename = "uploadDocument")]
    UploadDocument(UploadDocumentMessage),
    #[serde(rename = "changePage")]
    ChangePage(ChangePageMessage),
    #[serde(rename = "ping")]
    Ping,
}

impl ClientMessage {
    /// Wire name of the request, used to label error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Login(_) => "login",
            ClientMessage::RequestSnapshot => "requestSnapshot",
            ClientMessage::UploadDocument(_) => "uploadDocument",
            ClientMessage::ChangePage(_) => "changePage",
            ClientMessage::Ping => "ping",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginAckMessage {
    pub role: Role,
    pub display_name: String,
}

/// Full session state. `document` is explicitly null when nothing is loaded.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    #[serde_as(as = "Option<Base64>")]
    pub document: Option<DocumentBytes>,
    pub document_version: u64,
    pub page: u32,
    pub revision: u64,
    pub participants: usize,
}

/// A new document. Implies the page is reset to 1.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBroadcastMessage {
    #[serde_as(as = "Base64")]
    pub document: DocumentBytes,
    pub document_version: u64,
    pub uploaded_by: String,
    pub revision: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageBroadcastMessage {
    pub page: u32,
    pub display_name: String,
    pub revision: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceBroadcastMessage {
    pub count: usize,
    pub revision: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    NotAuthorized,
    PageOutOfRange,
    InvalidDisplayName,
    DocumentTooLarge,
    Unavailable,
    BadRequest,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Messages sent by the server, either as a reply or as a broadcast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "loginAck")]
    LoginAck(LoginAckMessage),
    #[serde(rename = "snapshot")]
    Snapshot(SnapshotMessage),
    #[serde(rename = "documentBroadcast")]
    DocumentBroadcast(DocumentBroadcastMessage),
    #[serde(rename = "pageBroadcast")]
    PageBroadcast(PageBroadcastMessage),
    #[serde(rename = "presenceBroadcast")]
    PresenceBroadcast(PresenceBroadcastMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

impl ServerMessage {
    /// Session revision carried by a broadcast. Replies carry none.
    pub fn broadcast_revision(&self) -> Option<u64> {
        match self {
            ServerMessage::DocumentBroadcast(m) => Some(m.revision),
            ServerMessage::PageBroadcast(m) => Some(m.revision),
            ServerMessage::PresenceBroadcast(m) => Some(m.revision),
            _ => None,
        }
    }
}
