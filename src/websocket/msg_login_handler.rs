use tracing::warn;

use crate::models::{LoginAckMessage, LoginMessage, ServerMessage};
use super::connctx::ConnCtx;

/// Handle LoginMessage: register the participant and acknowledge the assigned role.
pub async fn handle_login_message(login_msg: LoginMessage, ctx: &ConnCtx) {
    match ctx.coordinator.login(ctx.connection_id, login_msg.display_name.clone()).await {
        Ok(role) => {
            ctx.mark_logged_in();
            ctx.reply(ServerMessage::LoginAck(LoginAckMessage {
                role,
                display_name: login_msg.display_name.trim().to_string(),
            }));
        }
        Err(e) => {
            warn!("Login failed on connection {}: {}", ctx.connection_id, e);
            ctx.reply_error(e.code(), e.to_string(), Some("login"));
        }
    }
}
