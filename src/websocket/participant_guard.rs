use crate::session::{ConnectionId, CoordinatorHandle};

/// Removes the participant from the session when the socket task ends, however it ends.
pub struct ParticipantGuard {
    coordinator: CoordinatorHandle,
    connection_id: ConnectionId,
}

impl ParticipantGuard {
    pub fn new(coordinator: CoordinatorHandle, connection_id: ConnectionId) -> Self {
        Self { coordinator, connection_id }
    }
}

impl Drop for ParticipantGuard {
    fn drop(&mut self) {
        self.coordinator.disconnect(self.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CoordinatorSettings, SessionCoordinator};
    use uuid::Uuid;

    #[tokio::test]
    async fn dropping_guard_removes_participant() {
        let coordinator = SessionCoordinator::spawn(CoordinatorSettings::default());
        let connection_id = Uuid::new_v4();
        coordinator.login(connection_id, "bob").await.unwrap();
        {
            let _guard = ParticipantGuard::new(coordinator.clone(), connection_id);
            assert_eq!(coordinator.stats().await.unwrap().participants.len(), 1);
        }
        assert!(coordinator.stats().await.unwrap().participants.is_empty());
    }
}
