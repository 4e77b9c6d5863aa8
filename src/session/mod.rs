//! Authoritative session state and the coordinator that serializes every change to it.

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod role;
pub mod store;

pub use coordinator::{CoordinatorHandle, CoordinatorSettings, SessionCoordinator, SessionStats};
pub use error::SessionError;
pub use registry::{ConnectionId, Participant, ParticipantRegistry};
pub use role::{AdminPolicy, Role};
pub use store::{DocumentBytes, DocumentSnapshot, DocumentStore};
