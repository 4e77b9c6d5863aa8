use std::mem;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{
    ChangePageMessage, ClientMessage, ErrorMessage, LoginMessage, ServerMessage, SnapshotMessage,
    UploadDocumentMessage,
};
use crate::session::{DocumentBytes, Role};
use super::connection::{Connection, ConnectionError};
use super::renderer::{
    clamp_page, DocumentRenderer, RenderFailure, RenderJob, RenderOutcome, RenderTicket,
    RenderedPage,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("only an admin may {0}")]
    NotAdmin(&'static str),
    #[error("page {0} is out of range, pages start at 1")]
    PageOutOfRange(i64),
}

/// Where the agent is in the login → snapshot → live sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unauthenticated,
    /// Login sent, no acknowledgement yet.
    LoggingIn,
    /// Logged in, waiting for the first snapshot.
    Authenticated(Role),
    NoDocument(Role),
    HasDocument { role: Role, page: u32 },
}

/// Local cache of the session as seen by one participant.
#[derive(Debug, Clone, Default)]
pub struct ClientViewState {
    pub document: Option<DocumentBytes>,
    pub document_version: u64,
    /// Authoritative page as broadcast. May exceed the page count.
    pub page: u32,
    pub page_count: Option<u32>,
    /// Bumped on every document replacement and every reset. Never goes back.
    pub render_generation: u64,
    /// Revision of the last snapshot or broadcast applied.
    pub revision: u64,
    pub displayed: Option<RenderTicket>,
    pub shown_page: Option<u32>,
    pub render_error: Option<String>,
}

/// What applying one server message did to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    LoggedIn(Role),
    Synced { page: u32, has_document: bool },
    DocumentReplaced { document_version: u64, generation: u64 },
    PageChanged { page: u32, by: String },
    PresenceChanged(usize),
    /// Broadcast held back until the snapshot arrives.
    Buffered,
    /// Broadcast or snapshot older than what is already applied.
    Ignored,
    Rejected(ErrorMessage),
    Pong,
    Disconnected,
}

/// Per-participant state machine that mirrors the session and decides what may be drawn.
pub struct ClientSyncAgent<C: Connection> {
    connection: C,
    display_name: Option<String>,
    role: Option<Role>,
    synced: bool,
    view: ClientViewState,
    pending: Vec<ServerMessage>,
    participants: usize,
    last_error: Option<ErrorMessage>,
    needs_resync: bool,
}

impl<C: Connection> ClientSyncAgent<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            display_name: None,
            role: None,
            synced: false,
            view: ClientViewState { page: 1, ..ClientViewState::default() },
            pending: Vec::new(),
            participants: 0,
            last_error: None,
            needs_resync: false,
        }
    }

    /// Open the connection if needed, log in and ask for the current state.
    pub async fn connect(&mut self, display_name: impl Into<String>) -> Result<(), ClientError> {
        let display_name = display_name.into();
        self.reset();
        if !self.connection.is_open() {
            self.connection.open().await?;
        }
        info!("Logging in as '{}'", display_name);
        self.display_name = Some(display_name.clone());
        self.connection.send(&ClientMessage::Login(LoginMessage { display_name })).await?;
        self.connection.send(&ClientMessage::RequestSnapshot).await?;
        Ok(())
    }

    /// Start over with the last display name. Nothing from the previous connection is kept.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        let display_name = self.display_name.clone().ok_or(ClientError::NotAuthenticated)?;
        self.connect(display_name).await
    }

    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        let closed = self.connection.close().await;
        self.reset();
        closed.map_err(ClientError::from)
    }

    /// Wait for the next server message and apply it.
    pub async fn next_event(&mut self) -> Result<AgentEvent, ClientError> {
        let message = match self.connection.recv().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("Connection closed by server");
                self.reset();
                return Ok(AgentEvent::Disconnected);
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.reset();
                return Err(e.into());
            }
        };

        let event = self.apply(message);
        if self.needs_resync {
            self.needs_resync = false;
            self.connection.send(&ClientMessage::RequestSnapshot).await?;
        }
        Ok(event)
    }

    /// Apply one server message to the local state.
    pub fn apply(&mut self, message: ServerMessage) -> AgentEvent {
        match message {
            ServerMessage::LoginAck(ack) => {
                info!("Logged in as '{}' with role {}", ack.display_name, ack.role);
                self.role = Some(ack.role);
                AgentEvent::LoggedIn(ack.role)
            }
            ServerMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            ServerMessage::Error(err) => {
                warn!("Server rejected {:?}: {}", err.request, err.message);
                if err.request.as_deref() == Some("login") {
                    // Nothing that follows a refused login belongs to us.
                    self.reset();
                    self.display_name = None;
                }
                self.last_error = Some(err.clone());
                AgentEvent::Rejected(err)
            }
            ServerMessage::Pong(_) => AgentEvent::Pong,
            broadcast => {
                if !self.synced {
                    self.pending.push(broadcast);
                    return AgentEvent::Buffered;
                }
                self.apply_broadcast(broadcast)
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: SnapshotMessage) -> AgentEvent {
        if self.display_name.is_none() {
            debug!("Ignoring snapshot while logged out");
            return AgentEvent::Ignored;
        }
        if self.synced && snapshot.revision < self.view.revision {
            debug!(
                "Ignoring snapshot at revision {} behind {}",
                snapshot.revision, self.view.revision
            );
            return AgentEvent::Ignored;
        }

        match snapshot.document {
            Some(document) => {
                let changed = snapshot.document_version != self.view.document_version;
                if self.view.document.is_none() || changed {
                    self.replace_document(document, snapshot.document_version);
                }
            }
            None => {
                if self.view.document.take().is_some() {
                    self.view.render_generation += 1;
                }
                self.view.document_version = snapshot.document_version;
                self.view.page_count = None;
            }
        }
        self.view.page = snapshot.page;
        self.view.revision = snapshot.revision;
        self.participants = snapshot.participants;
        self.synced = true;
        debug!("Synced at revision {} on page {}", snapshot.revision, snapshot.page);

        for broadcast in mem::take(&mut self.pending) {
            if broadcast.broadcast_revision() > Some(snapshot.revision) {
                self.apply_broadcast(broadcast);
            }
        }

        AgentEvent::Synced {
            page: self.view.page,
            has_document: self.view.document.is_some(),
        }
    }

    fn apply_broadcast(&mut self, broadcast: ServerMessage) -> AgentEvent {
        let Some(revision) = broadcast.broadcast_revision() else {
            return AgentEvent::Ignored;
        };
        if revision <= self.view.revision {
            debug!(
                "Dropping broadcast at revision {}, already at {}",
                revision, self.view.revision
            );
            return AgentEvent::Ignored;
        }
        if revision > self.view.revision + 1 {
            warn!(
                "Missed broadcasts between revision {} and {}, resyncing",
                self.view.revision, revision
            );
            self.needs_resync = true;
        }
        self.view.revision = revision;

        match broadcast {
            ServerMessage::DocumentBroadcast(msg) => {
                info!("Document v{} from '{}'", msg.document_version, msg.uploaded_by);
                self.replace_document(msg.document, msg.document_version);
                self.view.page = 1;
                AgentEvent::DocumentReplaced {
                    document_version: msg.document_version,
                    generation: self.view.render_generation,
                }
            }
            ServerMessage::PageBroadcast(msg) => {
                debug!("Page {} from '{}'", msg.page, msg.display_name);
                self.view.page = msg.page;
                AgentEvent::PageChanged { page: msg.page, by: msg.display_name }
            }
            ServerMessage::PresenceBroadcast(msg) => {
                self.participants = msg.count;
                AgentEvent::PresenceChanged(msg.count)
            }
            _ => AgentEvent::Ignored,
        }
    }

    fn replace_document(&mut self, document: DocumentBytes, document_version: u64) {
        self.view.document = Some(document);
        self.view.document_version = document_version;
        self.view.render_generation += 1;
        self.view.page_count = None;
        self.view.render_error = None;
    }

    fn reset(&mut self) {
        self.role = None;
        self.synced = false;
        self.pending.clear();
        self.participants = 0;
        self.needs_resync = false;
        self.view = ClientViewState {
            page: 1,
            render_generation: self.view.render_generation + 1,
            ..ClientViewState::default()
        };
    }

    fn current_ticket(&self) -> RenderTicket {
        RenderTicket {
            generation: self.view.render_generation,
            page: self.view.page,
        }
    }

    /// A render for the current document and page. `None` until a complete document is held.
    pub fn begin_render(&self) -> Option<RenderJob> {
        if !self.synced {
            return None;
        }
        let document = self.view.document.clone()?;
        Some(RenderJob {
            ticket: self.current_ticket(),
            document,
        })
    }

    /// Accept a finished render if its ticket is still current.
    pub fn complete_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<RenderedPage, RenderFailure>,
    ) -> RenderOutcome {
        if !self.synced || self.view.document.is_none() || ticket != self.current_ticket() {
            debug!(
                "Discarding stale render for generation {} page {}",
                ticket.generation, ticket.page
            );
            return RenderOutcome::StaleDiscarded;
        }

        match result {
            Ok(rendered) => {
                self.view.page_count = Some(rendered.page_count);
                self.view.displayed = Some(ticket);
                self.view.shown_page = Some(rendered.shown_page);
                self.view.render_error = None;
                RenderOutcome::Displayed(rendered)
            }
            Err(failure) => {
                error!("Render failed: {}", failure);
                self.view.render_error = Some(failure.to_string());
                RenderOutcome::Failed(failure)
            }
        }
    }

    /// Render the current view in place.
    pub fn render_current<R: DocumentRenderer>(
        &mut self,
        renderer: &R,
        surface: &mut R::Surface,
    ) -> Option<RenderOutcome> {
        let job = self.begin_render()?;
        let result = job.run(renderer, surface);
        Some(self.complete_render(job.ticket, result))
    }

    fn require_admin(&self, action: &'static str) -> Result<String, ClientError> {
        match (self.role, &self.display_name) {
            (Some(Role::Admin), Some(name)) => Ok(name.clone()),
            (Some(Role::Viewer), _) => Err(ClientError::NotAdmin(action)),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    pub async fn upload_document(
        &mut self,
        document: impl Into<DocumentBytes>,
    ) -> Result<(), ClientError> {
        let display_name = self.require_admin("upload a document")?;
        let upload = UploadDocumentMessage {
            document: document.into(),
            display_name,
        };
        self.connection.send(&ClientMessage::UploadDocument(upload)).await?;
        Ok(())
    }

    pub async fn change_page(&mut self, page: i64) -> Result<(), ClientError> {
        let display_name = self.require_admin("change the page")?;
        if page < 1 {
            return Err(ClientError::PageOutOfRange(page));
        }
        self.connection
            .send(&ClientMessage::ChangePage(ChangePageMessage { page, display_name }))
            .await?;
        Ok(())
    }

    /// The page on screen: the session page clamped to the known page count.
    fn visible_page(&self) -> u32 {
        match self.view.page_count {
            Some(count) => clamp_page(self.view.page, count),
            None => self.view.page,
        }
    }

    /// Ask for the page after the visible one. Returns whether a request went out.
    pub async fn next_page(&mut self) -> Result<bool, ClientError> {
        let current = self.visible_page();
        if self.view.page_count.is_some_and(|count| current >= count) {
            return Ok(false);
        }
        self.change_page(i64::from(current.saturating_add(1))).await?;
        Ok(true)
    }

    /// Ask for the page before the visible one. Never goes below 1.
    pub async fn previous_page(&mut self) -> Result<bool, ClientError> {
        let current = self.visible_page();
        if current <= 1 {
            return Ok(false);
        }
        self.change_page(i64::from(current - 1)).await?;
        Ok(true)
    }

    pub async fn request_snapshot(&mut self) -> Result<(), ClientError> {
        self.connection.send(&ClientMessage::RequestSnapshot).await?;
        Ok(())
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.connection.send(&ClientMessage::Ping).await?;
        Ok(())
    }

    pub fn state(&self) -> SyncState {
        match self.role {
            None if self.display_name.is_some() && self.connection.is_open() => {
                SyncState::LoggingIn
            }
            None => SyncState::Unauthenticated,
            Some(role) if !self.synced => SyncState::Authenticated(role),
            Some(role) => match self.view.document {
                Some(_) => SyncState::HasDocument { role, page: self.view.page },
                None => SyncState::NoDocument(role),
            },
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn can_upload(&self) -> bool {
        self.role.is_some_and(|r| r.is_admin())
    }

    pub fn can_navigate(&self) -> bool {
        self.can_upload() && matches!(self.state(), SyncState::HasDocument { .. })
    }

    pub fn view(&self) -> &ClientViewState {
        &self.view
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    pub fn last_error(&self) -> Option<&ErrorMessage> {
        self.last_error.as_ref()
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::renderer::{DecodeError, DecodedDocument, RenderError};
    use crate::models::{
        DocumentBroadcastMessage, ErrorCode, LoginAckMessage, PageBroadcastMessage,
        PresenceBroadcastMessage,
    };
    use crate::session::{CoordinatorSettings, SessionCoordinator};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Default)]
    struct MockConnection {
        open: bool,
        sent: Vec<ClientMessage>,
        inbox: VecDeque<ServerMessage>,
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn open(&mut self) -> Result<(), ConnectionError> {
            self.open = true;
            Ok(())
        }

        async fn send(&mut self, message: &ClientMessage) -> Result<(), ConnectionError> {
            if !self.open {
                return Err(ConnectionError::NotOpen);
            }
            self.sent.push(message.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<ServerMessage>, ConnectionError> {
            let message = self.inbox.pop_front();
            if message.is_none() {
                self.open = false;
            }
            Ok(message)
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    struct FakeDocument {
        label: String,
        pages: u32,
    }

    impl DecodedDocument for FakeDocument {
        fn page_count(&self) -> u32 {
            self.pages
        }
    }

    /// Documents look like `label:pages`.
    struct FakeRenderer;

    impl DocumentRenderer for FakeRenderer {
        type Decoded = FakeDocument;
        type Surface = Vec<String>;

        fn decode(&self, document: &[u8]) -> Result<FakeDocument, DecodeError> {
            let text = std::str::from_utf8(document).map_err(|e| DecodeError(e.to_string()))?;
            let (label, pages) = text
                .split_once(':')
                .ok_or_else(|| DecodeError("no page count".into()))?;
            let pages = pages.parse().map_err(|_| DecodeError("bad page count".into()))?;
            Ok(FakeDocument { label: label.to_string(), pages })
        }

        fn render_page(
            &self,
            decoded: &FakeDocument,
            page: u32,
            surface: &mut Vec<String>,
        ) -> Result<(), RenderError> {
            surface.push(format!("{}#{}", decoded.label, page));
            Ok(())
        }
    }

    fn doc(bytes: &[u8]) -> DocumentBytes {
        Arc::from(bytes)
    }

    fn login_ack(role: Role, name: &str) -> ServerMessage {
        ServerMessage::LoginAck(LoginAckMessage { role, display_name: name.into() })
    }

    fn snapshot(document: Option<&[u8]>, version: u64, page: u32, revision: u64) -> ServerMessage {
        ServerMessage::Snapshot(SnapshotMessage {
            document: document.map(doc),
            document_version: version,
            page,
            revision,
            participants: 2,
        })
    }

    fn document_broadcast(bytes: &[u8], version: u64, revision: u64) -> ServerMessage {
        ServerMessage::DocumentBroadcast(DocumentBroadcastMessage {
            document: doc(bytes),
            document_version: version,
            uploaded_by: "admin".into(),
            revision,
        })
    }

    fn page_broadcast(page: u32, revision: u64) -> ServerMessage {
        ServerMessage::PageBroadcast(PageBroadcastMessage {
            page,
            display_name: "admin".into(),
            revision,
        })
    }

    async fn logged_in(role: Role) -> ClientSyncAgent<MockConnection> {
        let mut agent = ClientSyncAgent::new(MockConnection::default());
        let name = if role.is_admin() { "admin" } else { "bob" };
        agent.connect(name).await.unwrap();
        agent.apply(login_ack(role, name));
        agent
    }

    #[tokio::test]
    async fn connect_sends_login_then_snapshot_request() {
        let mut agent = ClientSyncAgent::new(MockConnection::default());
        assert_eq!(agent.state(), SyncState::Unauthenticated);
        agent.connect("bob").await.unwrap();
        assert_eq!(agent.state(), SyncState::LoggingIn);
        assert_eq!(
            agent.connection().sent,
            vec![
                ClientMessage::Login(LoginMessage { display_name: "bob".into() }),
                ClientMessage::RequestSnapshot,
            ]
        );

        agent.apply(login_ack(Role::Viewer, "bob"));
        assert_eq!(agent.state(), SyncState::Authenticated(Role::Viewer));
        agent.apply(snapshot(None, 0, 1, 4));
        assert_eq!(agent.state(), SyncState::NoDocument(Role::Viewer));
        assert!(agent.begin_render().is_none());
    }

    #[tokio::test]
    async fn late_joiner_lands_on_snapshot_page() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 1, 3));
        assert_eq!(agent.state(), SyncState::HasDocument { role: Role::Viewer, page: 1 });

        let mut surface = Vec::new();
        let outcome = agent.render_current(&FakeRenderer, &mut surface);
        let shown = RenderedPage { page_count: 5, shown_page: 1 };
        assert_eq!(outcome, Some(RenderOutcome::Displayed(shown)));
        assert_eq!(surface, vec!["D1#1"]);
    }

    #[tokio::test]
    async fn broadcasts_before_snapshot_are_replayed_when_newer() {
        let mut agent = logged_in(Role::Viewer).await;
        assert_eq!(agent.apply(page_broadcast(2, 5)), AgentEvent::Buffered);
        assert_eq!(agent.apply(page_broadcast(4, 7)), AgentEvent::Buffered);

        agent.apply(snapshot(Some(b"D1:5"), 1, 2, 6));
        assert_eq!(agent.view().page, 4);
        assert_eq!(agent.view().revision, 7);
    }

    #[tokio::test]
    async fn stale_broadcasts_are_dropped() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 3, 10));
        assert_eq!(agent.apply(page_broadcast(1, 9)), AgentEvent::Ignored);
        assert_eq!(agent.apply(page_broadcast(1, 10)), AgentEvent::Ignored);
        assert_eq!(agent.view().page, 3);
        assert_eq!(
            agent.apply(page_broadcast(2, 11)),
            AgentEvent::PageChanged { page: 2, by: "admin".into() }
        );
    }

    #[tokio::test]
    async fn document_in_flight_is_discarded_when_replaced() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(None, 0, 1, 1));
        agent.apply(document_broadcast(b"D1:5", 1, 2));

        // D1 starts rendering on a slow path.
        let slow = agent.begin_render().unwrap();

        // D2 lands before D1 finishes.
        agent.apply(document_broadcast(b"D2:3", 2, 3));
        let mut surface = Vec::new();
        let late = slow.run(&FakeRenderer, &mut surface);
        assert_eq!(agent.complete_render(slow.ticket, late), RenderOutcome::StaleDiscarded);
        assert!(agent.view().displayed.is_none());

        let fresh = agent.begin_render().unwrap();
        let result = fresh.run(&FakeRenderer, &mut surface);
        let outcome = agent.complete_render(fresh.ticket, result);
        assert!(matches!(outcome, RenderOutcome::Displayed(_)));
        assert_eq!(surface.last().map(String::as_str), Some("D2#1"));
        assert_eq!(agent.view().displayed, Some(fresh.ticket));
        assert_eq!(agent.state(), SyncState::HasDocument { role: Role::Viewer, page: 1 });
    }

    #[tokio::test]
    async fn render_for_previous_page_is_discarded() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 2, 1));
        let job = agent.begin_render().unwrap();
        agent.apply(page_broadcast(3, 2));

        let result = job.run(&FakeRenderer, &mut Vec::new());
        assert_eq!(agent.complete_render(job.ticket, result), RenderOutcome::StaleDiscarded);
        // The document itself is unchanged by a page move.
        assert_eq!(agent.begin_render().unwrap().ticket.generation, job.ticket.generation);
    }

    #[tokio::test]
    async fn large_page_is_clamped_for_display_only() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 9, 1));
        let outcome = agent.render_current(&FakeRenderer, &mut Vec::new());
        let shown = RenderedPage { page_count: 5, shown_page: 5 };
        assert_eq!(outcome, Some(RenderOutcome::Displayed(shown)));
        assert_eq!(agent.view().page, 9);
    }

    #[tokio::test]
    async fn decode_failure_is_local_error_state() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"garbage"), 1, 1, 1));
        let outcome = agent.render_current(&FakeRenderer, &mut Vec::new()).unwrap();
        assert!(matches!(outcome, RenderOutcome::Failed(RenderFailure::Decode(_))));
        assert!(agent.view().render_error.is_some());

        agent.apply(document_broadcast(b"D2:2", 2, 2));
        assert!(agent.view().render_error.is_none());
    }

    #[tokio::test]
    async fn viewer_controls_are_disabled_locally() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 1, 1));
        let sent_before = agent.connection().sent.len();

        assert!(!agent.can_upload());
        assert!(!agent.can_navigate());
        assert!(matches!(agent.change_page(2).await, Err(ClientError::NotAdmin(_))));
        let upload = agent.upload_document(doc(b"x:1")).await;
        assert!(matches!(upload, Err(ClientError::NotAdmin(_))));
        assert_eq!(agent.connection().sent.len(), sent_before);
    }

    #[tokio::test]
    async fn admin_navigation_respects_bounds() {
        let mut agent = logged_in(Role::Admin).await;
        agent.apply(snapshot(Some(b"D1:2"), 1, 1, 1));
        assert!(agent.can_navigate());
        assert!(!agent.previous_page().await.unwrap());
        agent.render_current(&FakeRenderer, &mut Vec::new());

        assert!(agent.next_page().await.unwrap());
        agent.apply(page_broadcast(2, 2));
        assert!(!agent.next_page().await.unwrap());
        assert!(agent.previous_page().await.unwrap());
        assert!(matches!(agent.change_page(0).await, Err(ClientError::PageOutOfRange(0))));

        assert_eq!(sent_pages(&agent), vec![2, 1]);
    }

    fn sent_pages(agent: &ClientSyncAgent<MockConnection>) -> Vec<i64> {
        agent
            .connection()
            .sent
            .iter()
            .filter_map(|m| match m {
                ClientMessage::ChangePage(c) => Some(c.page),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn navigation_past_last_page_starts_from_visible_page() {
        let mut agent = logged_in(Role::Admin).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 9, 1));
        agent.render_current(&FakeRenderer, &mut Vec::new());
        assert_eq!(agent.view().shown_page, Some(5));

        // Page 5 of 5 is on screen, so there is no next page to move to.
        assert!(!agent.next_page().await.unwrap());
        assert!(agent.previous_page().await.unwrap());
        assert_eq!(sent_pages(&agent), vec![4]);
    }

    #[tokio::test]
    async fn refused_login_drops_back_to_unauthenticated() {
        let mut agent = ClientSyncAgent::new(MockConnection::default());
        agent.connect("   ").await.unwrap();
        let err = ErrorMessage {
            code: ErrorCode::InvalidDisplayName,
            message: "display name must not be empty".into(),
            request: Some("login".into()),
        };
        agent.apply(ServerMessage::Error(err));
        assert_eq!(agent.state(), SyncState::Unauthenticated);

        // The snapshot queued behind the login is not ours to show.
        assert_eq!(agent.apply(snapshot(Some(b"D1:5"), 1, 1, 2)), AgentEvent::Ignored);
        assert!(agent.begin_render().is_none());
        assert_eq!(agent.state(), SyncState::Unauthenticated);
        assert!(matches!(agent.reconnect().await, Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn revision_gap_requests_fresh_snapshot() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 1, 1));
        agent.connection.inbox.push_back(page_broadcast(4, 5));

        let event = agent.next_event().await.unwrap();
        assert_eq!(event, AgentEvent::PageChanged { page: 4, by: "admin".into() });
        assert_eq!(agent.connection().sent.last(), Some(&ClientMessage::RequestSnapshot));
    }

    #[tokio::test]
    async fn server_rejection_is_recorded() {
        let mut agent = logged_in(Role::Viewer).await;
        let err = ErrorMessage {
            code: ErrorCode::NotAuthorized,
            message: "only an admin may change the page".into(),
            request: Some("changePage".into()),
        };
        assert_eq!(agent.apply(ServerMessage::Error(err.clone())), AgentEvent::Rejected(err));
        assert_eq!(agent.last_error().map(|e| e.code), Some(ErrorCode::NotAuthorized));
    }

    #[tokio::test]
    async fn disconnect_clears_view_and_reconnect_starts_over() {
        let mut agent = logged_in(Role::Viewer).await;
        agent.apply(snapshot(Some(b"D1:5"), 1, 3, 4));
        let presence = PresenceBroadcastMessage { count: 3, revision: 5 };
        agent.apply(ServerMessage::PresenceBroadcast(presence));
        let in_flight = agent.begin_render().unwrap();

        // Server goes away: the inbox is empty, so recv reports a close.
        assert_eq!(agent.next_event().await.unwrap(), AgentEvent::Disconnected);
        assert_eq!(agent.state(), SyncState::Unauthenticated);
        assert!(agent.view().document.is_none());
        assert_eq!(agent.participants(), 0);

        agent.reconnect().await.unwrap();
        let sent = &agent.connection().sent;
        let login = ClientMessage::Login(LoginMessage { display_name: "bob".into() });
        assert_eq!(sent[sent.len() - 2], login);
        assert_eq!(sent[sent.len() - 1], ClientMessage::RequestSnapshot);

        agent.apply(login_ack(Role::Viewer, "bob"));
        agent.apply(snapshot(Some(b"D1:5"), 1, 3, 6));
        let result = in_flight.run(&FakeRenderer, &mut Vec::new());
        let outcome = agent.complete_render(in_flight.ticket, result);
        assert_eq!(outcome, RenderOutcome::StaleDiscarded);
    }

    #[tokio::test]
    async fn viewers_converge_with_coordinator() {
        let coordinator = SessionCoordinator::spawn(CoordinatorSettings::default());
        let admin = Uuid::new_v4();
        coordinator.login(admin, "admin").await.unwrap();

        // A viewer connected from the start sees every broadcast.
        let mut early = logged_in(Role::Viewer).await;
        let mut events = coordinator.subscribe();
        early.apply(ServerMessage::Snapshot(coordinator.request_snapshot().await.unwrap()));

        coordinator.upload_document(admin, doc(b"D1:5")).await.unwrap();
        coordinator.change_page(admin, 3).await.unwrap();
        coordinator.upload_document(admin, doc(b"D2:4")).await.unwrap();
        coordinator.change_page(admin, 2).await.unwrap();
        while let Ok(msg) = events.try_recv() {
            early.apply(msg);
        }

        // A viewer joining now only gets the snapshot.
        let mut late = logged_in(Role::Viewer).await;
        late.apply(ServerMessage::Snapshot(coordinator.request_snapshot().await.unwrap()));

        let session = coordinator.request_snapshot().await.unwrap();
        for agent in [&early, &late] {
            assert_eq!(agent.view().document, session.document);
            assert_eq!(agent.view().page, session.page);
            assert_eq!(agent.view().revision, session.revision);
        }

        let (mut a, mut b) = (Vec::new(), Vec::new());
        early.render_current(&FakeRenderer, &mut a);
        late.render_current(&FakeRenderer, &mut b);
        assert_eq!(a, vec!["D2#2"]);
        assert_eq!(a, b);
    }
}
