use tracing::{debug, warn};

use crate::models::ChangePageMessage;
use super::connctx::ConnCtx;

/// Handle ChangePageMessage. Success is visible to the requester through the broadcast.
pub async fn handle_page_message(page_msg: ChangePageMessage, ctx: &ConnCtx) {
    debug!(
        "Page {} requested by '{}' on connection {}",
        page_msg.page, page_msg.display_name, ctx.connection_id
    );
    if let Err(e) = ctx.coordinator.change_page(ctx.connection_id, page_msg.page).await {
        warn!("Page change rejected on connection {}: {}", ctx.connection_id, e);
        ctx.reply_error(e.code(), e.to_string(), Some("changePage"));
    }
}
