use tracing::{info, warn};

use crate::models::UploadDocumentMessage;
use super::connctx::ConnCtx;

/// Handle UploadDocumentMessage. Success is visible to the uploader through the broadcast.
pub async fn handle_upload_message(upload_msg: UploadDocumentMessage, ctx: &ConnCtx) {
    info!(
        "Upload of {} bytes requested by '{}' on connection {}",
        upload_msg.document.len(),
        upload_msg.display_name,
        ctx.connection_id
    );
    if let Err(e) = ctx.coordinator.upload_document(ctx.connection_id, upload_msg.document).await {
        warn!("Upload rejected on connection {}: {}", ctx.connection_id, e);
        ctx.reply_error(e.code(), e.to_string(), Some("uploadDocument"));
    }
}
