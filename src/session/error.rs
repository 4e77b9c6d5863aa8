use thiserror::Error;

use crate::models::ErrorCode;

/// Failure of a coordinator command. Reported to the requester only, never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("only an admin may {0}")]
    NotAuthorized(&'static str),
    #[error("page {0} is out of range, pages start at 1")]
    PageOutOfRange(i64),
    #[error("display name must not be empty")]
    InvalidDisplayName,
    #[error("document of {size} bytes exceeds the limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },
    #[error("session coordinator did not answer in time")]
    Timeout,
    #[error("session coordinator is not running")]
    Unavailable,
}

impl SessionError {
    /// Wire code sent back to the requesting client.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            SessionError::PageOutOfRange(_) => ErrorCode::PageOutOfRange,
            SessionError::InvalidDisplayName => ErrorCode::InvalidDisplayName,
            SessionError::DocumentTooLarge { .. } => ErrorCode::DocumentTooLarge,
            SessionError::Timeout | SessionError::Unavailable => ErrorCode::Unavailable,
        }
    }
}
