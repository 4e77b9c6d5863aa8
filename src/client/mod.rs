//! Participant side of the session protocol.

pub mod agent;
pub mod connection;
pub mod renderer;

pub use agent::{AgentEvent, ClientError, ClientSyncAgent, ClientViewState, SyncState};
pub use connection::{Connection, ConnectionError, WsConnection};
pub use renderer::{
    DecodeError, DecodedDocument, DocumentRenderer, RenderError, RenderFailure, RenderJob,
    RenderOutcome, RenderTicket, RenderedPage,
};
