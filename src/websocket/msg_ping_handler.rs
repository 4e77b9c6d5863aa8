use tracing::debug;
use chrono::Utc;

use crate::models::{PongMessage, ServerMessage};
use super::connctx::ConnCtx;

/// Handle PingMessage
pub async fn handle_ping_message(ctx: &ConnCtx) {
    debug!("Ping received on connection {}", ctx.connection_id);
    ctx.reply(ServerMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() }));
}
