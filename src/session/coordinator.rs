use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::models::{
    DocumentBroadcastMessage, PageBroadcastMessage, ParticipantInfo, PresenceBroadcastMessage,
    ServerMessage, SnapshotMessage,
};
use super::error::SessionError;
use super::registry::{ConnectionId, ParticipantRegistry};
use super::role::{assign_role, claims_admin, AdminPolicy, Role};
use super::store::{DocumentBytes, DocumentStore};

/// Tunables for the coordinator, usually derived from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub admin_name: String,
    pub admin_policy: AdminPolicy,
    pub broadcast_capacity: usize,
    pub command_timeout: Duration,
    pub max_document_bytes: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            admin_name: "admin".to_string(),
            admin_policy: AdminPolicy::Shared,
            broadcast_capacity: 256,
            command_timeout: Duration::from_secs(5),
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Counters exposed through the diagnostics and session endpoints.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub participants: Vec<ParticipantInfo>,
    pub admins: usize,
    pub has_document: bool,
    pub document_bytes: usize,
    pub document_version: u64,
    pub page: u32,
    pub revision: u64,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Login {
        connection_id: ConnectionId,
        display_name: String,
        reply: Reply<Result<Role, SessionError>>,
    },
    Snapshot {
        reply: Reply<SnapshotMessage>,
    },
    UploadDocument {
        connection_id: ConnectionId,
        document: DocumentBytes,
        reply: Reply<Result<(), SessionError>>,
    },
    ChangePage {
        connection_id: ConnectionId,
        page: i64,
        reply: Reply<Result<u32, SessionError>>,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Stats {
        reply: Reply<SessionStats>,
    },
}

/// Owner of the session state. Runs as a single task, so commands are applied one at a
/// time and every broadcast leaves in the order its mutation was applied.
pub struct SessionCoordinator {
    settings: CoordinatorSettings,
    store: DocumentStore,
    registry: ParticipantRegistry,
    revision: u64,
    events: broadcast::Sender<ServerMessage>,
}

impl SessionCoordinator {
    /// Start the coordinator task and return a handle to it.
    pub fn spawn(settings: CoordinatorSettings) -> CoordinatorHandle {
        let (events, _) = broadcast::channel(settings.broadcast_capacity.max(1));
        let (commands, rx) = mpsc::unbounded_channel();
        let handle = CoordinatorHandle {
            commands,
            events: events.clone(),
            command_timeout: settings.command_timeout,
        };

        info!(
            "Session coordinator starting (admin name '{}', policy {})",
            settings.admin_name, settings.admin_policy
        );
        let coordinator = SessionCoordinator {
            settings,
            store: DocumentStore::new(),
            registry: ParticipantRegistry::new(),
            revision: 0,
            events,
        };
        tokio::spawn(coordinator.run(rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        info!("Session coordinator stopped");
    }

    fn apply(&mut self, command: Command) {
        // A dropped reply receiver means the requester gave up; the mutation still stands.
        match command {
            Command::Login { connection_id, display_name, reply } => {
                let _ = reply.send(self.login(connection_id, display_name));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::UploadDocument { connection_id, document, reply } => {
                let _ = reply.send(self.upload_document(connection_id, document));
            }
            Command::ChangePage { connection_id, page, reply } => {
                let _ = reply.send(self.change_page(connection_id, page));
            }
            Command::Disconnect { connection_id } => self.disconnect(connection_id),
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn login(
        &mut self,
        connection_id: ConnectionId,
        display_name: String,
    ) -> Result<Role, SessionError> {
        let display_name = display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(SessionError::InvalidDisplayName);
        }

        let admin_held = self.registry.admin_held_elsewhere(&connection_id);
        let role = assign_role(
            &display_name,
            &self.settings.admin_name,
            self.settings.admin_policy,
            admin_held,
        );
        if role == Role::Viewer && claims_admin(&display_name, &self.settings.admin_name) {
            warn!("Admin lease already held, '{}' joins as viewer", display_name);
        }

        info!("Participant '{}' logged in as {} ({})", display_name, role, connection_id);
        self.registry.add(connection_id, display_name, role);
        self.broadcast_presence();
        Ok(role)
    }

    fn snapshot(&self) -> SnapshotMessage {
        let snapshot = self.store.snapshot();
        SnapshotMessage {
            document: snapshot.document,
            document_version: snapshot.document_version,
            page: snapshot.page,
            revision: self.revision,
            participants: self.registry.count(),
        }
    }

    /// Role of a logged-in connection, failing unless it is admin.
    fn require_admin(
        &self,
        connection_id: &ConnectionId,
        action: &'static str,
    ) -> Result<String, SessionError> {
        match self.registry.get(connection_id) {
            Some(p) if p.role.is_admin() => Ok(p.display_name.clone()),
            Some(p) => {
                warn!("Viewer '{}' attempted to {}", p.display_name, action);
                Err(SessionError::NotAuthorized(action))
            }
            None => {
                warn!("Connection {} attempted to {} without logging in", connection_id, action);
                Err(SessionError::NotAuthorized(action))
            }
        }
    }

    fn upload_document(
        &mut self,
        connection_id: ConnectionId,
        document: DocumentBytes,
    ) -> Result<(), SessionError> {
        let uploaded_by = self.require_admin(&connection_id, "upload a document")?;
        let limit = self.settings.max_document_bytes;
        if document.len() > limit {
            return Err(SessionError::DocumentTooLarge { size: document.len(), limit });
        }

        let document_version = self.store.replace_document(document.clone());
        info!(
            "Document v{} ({} bytes) uploaded by '{}'",
            document_version,
            document.len(),
            uploaded_by
        );
        self.broadcast(|revision| {
            ServerMessage::DocumentBroadcast(DocumentBroadcastMessage {
                document,
                document_version,
                uploaded_by,
                revision,
            })
        });
        Ok(())
    }

    fn change_page(&mut self, connection_id: ConnectionId, page: i64) -> Result<u32, SessionError> {
        let display_name = self.require_admin(&connection_id, "change the page")?;
        let page = self.store.set_page(page)?;

        info!("Page set to {} by '{}'", page, display_name);
        self.broadcast(|revision| {
            ServerMessage::PageBroadcast(PageBroadcastMessage {
                page,
                display_name,
                revision,
            })
        });
        Ok(page)
    }

    fn disconnect(&mut self, connection_id: ConnectionId) {
        match self.registry.remove(&connection_id) {
            Some(participant) => {
                info!("Participant '{}' left ({})", participant.display_name, connection_id);
                self.broadcast_presence();
            }
            None => debug!("Connection {} closed before logging in", connection_id),
        }
    }

    fn stats(&self) -> SessionStats {
        let snapshot = self.store.snapshot();
        SessionStats {
            participants: self
                .registry
                .participants()
                .map(|p| ParticipantInfo {
                    display_name: p.display_name.clone(),
                    role: p.role,
                    joined_at: p.joined_at,
                })
                .collect(),
            admins: self.registry.admin_count(),
            has_document: self.store.has_document(),
            document_bytes: self.store.document_size(),
            document_version: snapshot.document_version,
            page: snapshot.page,
            revision: self.revision,
        }
    }

    fn broadcast_presence(&mut self) {
        let count = self.registry.count();
        self.broadcast(|revision| {
            ServerMessage::PresenceBroadcast(PresenceBroadcastMessage { count, revision })
        });
    }

    /// Every broadcast advances the revision, so receivers can detect replays and gaps.
    fn broadcast(&mut self, build: impl FnOnce(u64) -> ServerMessage) {
        self.revision += 1;
        let message = build(self.revision);
        if self.events.send(message).is_err() {
            debug!("No subscribers for revision {}", self.revision);
        }
    }
}

/// Cloneable front door to the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<ServerMessage>,
    command_timeout: Duration,
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(build(reply)).map_err(|_| SessionError::Unavailable)?;
        match timeout(self.command_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(SessionError::Unavailable),
            Err(_) => Err(SessionError::Timeout),
        }
    }

    /// Receive every broadcast issued after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }

    pub async fn login(
        &self,
        connection_id: ConnectionId,
        display_name: impl Into<String>,
    ) -> Result<Role, SessionError> {
        let display_name = display_name.into();
        self.request(|reply| Command::Login { connection_id, display_name, reply }).await?
    }

    pub async fn request_snapshot(&self) -> Result<SnapshotMessage, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn upload_document(
        &self,
        connection_id: ConnectionId,
        document: DocumentBytes,
    ) -> Result<(), SessionError> {
        self.request(|reply| Command::UploadDocument { connection_id, document, reply }).await?
    }

    pub async fn change_page(
        &self,
        connection_id: ConnectionId,
        page: i64,
    ) -> Result<u32, SessionError> {
        self.request(|reply| Command::ChangePage { connection_id, page, reply }).await?
    }

    /// Queue the removal of a participant. Safe to call from `Drop`.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        if self.commands.send(Command::Disconnect { connection_id }).is_err() {
            debug!("Coordinator gone, dropping disconnect for {}", connection_id);
        }
    }

    pub async fn stats(&self) -> Result<SessionStats, SessionError> {
        self.request(|reply| Command::Stats { reply }).await
    }
}
