use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::models::{ErrorCode, ErrorMessage, ServerMessage};
use crate::session::{ConnectionId, CoordinatorHandle};

/// Everything a message handler needs to know about the socket it serves.
#[derive(Clone)]
pub struct ConnCtx {
    pub connection_id: ConnectionId,
    pub coordinator: CoordinatorHandle,
    outbound: UnboundedSender<ServerMessage>,
    logged_in: Arc<AtomicBool>,
}

impl ConnCtx {
    pub fn new(
        connection_id: ConnectionId,
        coordinator: CoordinatorHandle,
        outbound: UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            connection_id,
            coordinator,
            outbound,
            logged_in: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once the first login succeeds. Session state is only shared from then on.
    pub fn mark_logged_in(&self) {
        self.logged_in.store(true, Ordering::Release);
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Acquire)
    }

    /// Queue a message for this connection. False once the writer is gone.
    pub fn deliver(&self, message: ServerMessage) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Queue a message for this connection only.
    pub fn reply(&self, message: ServerMessage) {
        if !self.deliver(message) {
            debug!("Writer for connection {} is gone, reply dropped", self.connection_id);
        }
    }

    pub fn reply_error(&self, code: ErrorCode, message: impl Into<String>, request: Option<&str>) {
        self.reply(ServerMessage::Error(ErrorMessage {
            code,
            message: message.into(),
            request: request.map(str::to_string),
        }));
    }
}
