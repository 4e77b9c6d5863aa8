use tracing::{debug, error, warn};

use crate::models::ServerMessage;
use crate::session::SessionError;
use super::connctx::ConnCtx;

/// Handle RequestSnapshot: send the full session state to this connection only.
pub async fn handle_snapshot_request(ctx: &ConnCtx) {
    if !ctx.is_logged_in() {
        warn!("Connection {} asked for a snapshot before logging in", ctx.connection_id);
        let e = SessionError::NotAuthorized("request a snapshot");
        ctx.reply_error(e.code(), e.to_string(), Some("requestSnapshot"));
        return;
    }

    match ctx.coordinator.request_snapshot().await {
        Ok(snapshot) => {
            debug!(
                "Snapshot for connection {} at revision {} (page {})",
                ctx.connection_id, snapshot.revision, snapshot.page
            );
            ctx.reply(ServerMessage::Snapshot(snapshot));
        }
        Err(e) => {
            error!("Failed to take snapshot for connection {}: {}", ctx.connection_id, e);
            ctx.reply_error(e.code(), e.to_string(), Some("requestSnapshot"));
        }
    }
}
