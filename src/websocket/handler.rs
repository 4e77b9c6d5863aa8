use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::{broadcast::{self, error::RecvError}, mpsc};
use tracing::{info, error, warn, debug};
use futures_util::{StreamExt, SinkExt};
use uuid::Uuid;

use crate::AppState;
use crate::models::{ClientMessage, ErrorCode, ServerMessage};
use super::connctx::ConnCtx;
use super::participant_guard::ParticipantGuard;
use super::msg_login_handler::handle_login_message;
use super::msg_page_handler::handle_page_message;
use super::msg_ping_handler::handle_ping_message;
use super::msg_snapshot_handler::handle_snapshot_request;
use super::msg_upload_handler::handle_upload_message;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    let max_message = app_state.config.max_message_bytes();
    ws.max_message_size(max_message)
        .max_frame_size(max_message)
        .on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Generate unique connection ID to identify this participant
    let connection_id = Uuid::new_v4();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let coordinator = app_state.coordinator.clone();

    // Subscribe before anything is handled so no broadcast after our snapshot can be missed
    let events = coordinator.subscribe();

    // Whatever ends this connection, the participant leaves the session
    let _participant = ParticipantGuard::new(coordinator.clone(), connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Replies and broadcasts share one queue so a single task owns the sink
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let ctx = ConnCtx::new(connection_id, coordinator.clone(), outbound_tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for {}: {}", connection_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Forward session broadcasts, including the ones caused by this connection
    let mut forward_task = tokio::spawn(forward_broadcasts(events, ctx.clone()));

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => handle_text_message(&text, &ctx).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", ctx.connection_id, e);
                    break;
                }
            }
        }
    });

    // Wait for any task to finish (and finish the others)
    tokio::select! {
        _ = (&mut recv_task) => { send_task.abort(); forward_task.abort(); }
        _ = (&mut send_task) => { recv_task.abort(); forward_task.abort(); }
        _ = (&mut forward_task) => { recv_task.abort(); send_task.abort(); }
    };
    info!("WebSocket connection {} terminated", connection_id);
}

/// Relay broadcasts to one connection once it has logged in. Anything dropped before
/// that predates the snapshot the connection asks for after its login.
pub async fn forward_broadcasts(mut events: broadcast::Receiver<ServerMessage>, ctx: ConnCtx) {
    loop {
        match events.recv().await {
            Ok(msg) => {
                if !ctx.is_logged_in() {
                    continue;
                }
                if !ctx.deliver(msg) {
                    break;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                if !ctx.is_logged_in() {
                    continue;
                }
                warn!(
                    "Connection {} lagged by {} broadcasts, resending snapshot",
                    ctx.connection_id, missed
                );
                handle_snapshot_request(&ctx).await;
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Parse one text frame and route it to its handler. Commands on one socket run in order.
pub async fn handle_text_message(text: &str, ctx: &ConnCtx) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            error!("Failed to parse message on connection {}: {}", ctx.connection_id, e);
            ctx.reply_error(ErrorCode::BadRequest, format!("Unreadable message: {e}"), None);
            return;
        }
    };
    debug!("Received {} on connection {}", msg.kind(), ctx.connection_id);

    match msg {
        ClientMessage::Login(login_msg) => handle_login_message(login_msg, ctx).await,
        ClientMessage::RequestSnapshot => handle_snapshot_request(ctx).await,
        ClientMessage::UploadDocument(upload_msg) => handle_upload_message(upload_msg, ctx).await,
        ClientMessage::ChangePage(page_msg) => handle_page_message(page_msg, ctx).await,
        ClientMessage::Ping => handle_ping_message(ctx).await,
    }
}
