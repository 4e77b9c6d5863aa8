pub mod connctx;
pub mod handler;
pub mod msg_login_handler;
pub mod msg_page_handler;
pub mod msg_ping_handler;
pub mod msg_snapshot_handler;
pub mod msg_upload_handler;
pub mod participant_guard;

pub use handler::websocket_handler;
