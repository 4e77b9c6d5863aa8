use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use super::role::Role;

pub type ConnectionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Logged-in participants keyed by connection. Its size is the presence count.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<ConnectionId, Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. A second login on the same connection replaces the first.
    pub fn add(
        &mut self,
        connection_id: ConnectionId,
        display_name: String,
        role: Role,
    ) -> Option<Participant> {
        let participant = Participant {
            connection_id,
            display_name,
            role,
            joined_at: Utc::now(),
        };
        self.participants.insert(connection_id, participant)
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.remove(connection_id)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(connection_id)
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn admin_count(&self) -> usize {
        self.participants.values().filter(|p| p.role.is_admin()).count()
    }

    /// Whether any connection other than `connection_id` holds the admin role.
    pub fn admin_held_elsewhere(&self, connection_id: &ConnectionId) -> bool {
        self.participants
            .values()
            .any(|p| p.role.is_admin() && &p.connection_id != connection_id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }
}
