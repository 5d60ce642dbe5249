// Session lifecycle coordinator: forwards session requests to the injected
// backend and re-broadcasts their completions as session events.

use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};

use crate::domain::{
    AdvertisementType, BackendCompletion, CompletionSender, DelegateHandle, GAME_SESSION,
    JoinResult, MATCH_TYPE_KEY, NULL_SUBSYSTEM, NetId, OperationKind, QuerySetting,
    SearchResult, SessionBackend, SessionError, SessionEvent, SessionSearch, SessionSettings,
};
use crate::use_cases::events::SessionEvents;

/// Settings shared by every session the coordinator manages.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Name of the single session slot.
    pub session_name: String,
    /// Subsystem name that marks an offline backend; sessions become LAN.
    pub null_subsystem_name: String,
    pub build_unique_id: u32,
    /// Events buffered per subscriber before it starts lagging.
    pub event_channel_capacity: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            session_name: GAME_SESSION.to_string(),
            null_subsystem_name: NULL_SUBSYSTEM.to_string(),
            build_unique_id: 1,
            event_channel_capacity: 64,
        }
    }
}

/// Create parameters latched while the existing session is destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCreate {
    pub num_public_connections: u32,
    pub match_type: String,
}

/// Owns the single named session slot and the listener registrations
/// for operations in flight.
///
/// Completions queue on a channel owned by the coordinator and are handled
/// by [`pump`](Self::pump) or [`next_completion`](Self::next_completion), on
/// whatever task drives the coordinator. At most one operation of each kind
/// may be outstanding; overlapping requests are rejected with
/// [`SessionError::OperationPending`].
///
/// Re-create on destroy runs inside the destroy completion handler: the new
/// create is submitted before the destroy event is emitted, and its own
/// completion is dispatched later from the queue.
pub struct SessionCoordinator<B: SessionBackend> {
    backend: Option<B>,
    local_player: NetId,
    settings: CoordinatorSettings,
    events: SessionEvents,
    completion_tx: CompletionSender,
    completion_rx: mpsc::UnboundedReceiver<BackendCompletion>,
    registrations: HashMap<OperationKind, DelegateHandle>,
    last_session_settings: Option<SessionSettings>,
    last_search: Option<SessionSearch>,
    pending_create: Option<PendingCreate>,
}

impl<B: SessionBackend> SessionCoordinator<B> {
    /// Creates a coordinator. A `None` backend behaves as an unavailable
    /// session service.
    pub fn new(backend: Option<B>, local_player: NetId, settings: CoordinatorSettings) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            local_player,
            events: SessionEvents::new(settings.event_channel_capacity),
            settings,
            completion_tx,
            completion_rx,
            registrations: HashMap::new(),
            last_session_settings: None,
            last_search: None,
            pending_create: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn local_player(&self) -> &NetId {
        &self.local_player
    }

    pub fn session_name(&self) -> &str {
        &self.settings.session_name
    }

    /// Settings of the last create request the backend accepted.
    pub fn last_session_settings(&self) -> Option<&SessionSettings> {
        self.last_session_settings.as_ref()
    }

    /// Last submitted search, with results once it completes.
    pub fn last_search(&self) -> Option<&SessionSearch> {
        self.last_search.as_ref()
    }

    pub fn pending_create(&self) -> Option<&PendingCreate> {
        self.pending_create.as_ref()
    }

    /// Returns true while a listener for `kind` is registered.
    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.registrations.contains_key(&kind)
    }

    /// Creates the game session, destroying an existing one first.
    ///
    /// With an existing session the parameters are latched and the create
    /// is replayed once the destroy completes successfully.
    pub fn create_session(
        &mut self,
        num_public_connections: u32,
        match_type: &str,
    ) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::debug!("create skipped: no session backend");
            return Err(SessionError::BackendUnavailable);
        }
        if self.pending_create.is_some() {
            return Err(SessionError::OperationPending(OperationKind::Create));
        }
        self.ensure_idle(OperationKind::Create)?;

        if self.does_session_exist() {
            tracing::info!(
                session_name = %self.settings.session_name,
                num_public_connections,
                match_type,
                "session already exists, destroying before re-create"
            );
            self.pending_create = Some(PendingCreate {
                num_public_connections,
                match_type: match_type.to_string(),
            });
            if let Err(error) = self.destroy_session() {
                self.pending_create = None;
                return Err(error);
            }
            return Ok(());
        }

        let session_settings = self.build_session_settings(num_public_connections, match_type);
        self.submit(OperationKind::Create, |backend, player, session_name| {
            backend.create_session(player, session_name, &session_settings)
        })?;

        tracing::debug!(
            session_name = %self.settings.session_name,
            num_public_connections,
            match_type,
            is_lan_match = session_settings.is_lan_match,
            "create session submitted"
        );
        self.last_session_settings = Some(session_settings);
        Ok(())
    }

    /// Searches for presence-enabled sessions.
    pub fn find_session(&mut self, max_search_results: u32) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::debug!("find skipped: no session backend");
            return Err(SessionError::BackendUnavailable);
        }
        self.ensure_idle(OperationKind::Find)?;

        let search = SessionSearch {
            max_search_results,
            is_lan_query: self.is_lan(),
            build_unique_id: self.settings.build_unique_id,
            query_settings: vec![QuerySetting::presence()],
            results: Vec::new(),
        };
        self.submit(OperationKind::Find, |backend, player, _| {
            backend.find_sessions(player, &search)
        })?;

        tracing::debug!(
            max_search_results,
            is_lan_query = search.is_lan_query,
            "find sessions submitted"
        );
        self.last_search = Some(search);
        Ok(())
    }

    /// Joins a session returned by a previous search.
    pub fn join_session(&mut self, result: &SearchResult) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::warn!("join failed: no session backend");
            self.events.emit(SessionEvent::JoinSessionComplete {
                result: JoinResult::UnknownError,
            });
            return Err(SessionError::BackendUnavailable);
        }
        self.ensure_idle(OperationKind::Join)?;

        self.submit(OperationKind::Join, |backend, player, session_name| {
            backend.join_session(player, session_name, result)
        })?;

        tracing::debug!(
            session_name = %self.settings.session_name,
            session_id = %result.session_id,
            "join session submitted"
        );
        Ok(())
    }

    /// Destroys the game session.
    pub fn destroy_session(&mut self) -> Result<(), SessionError> {
        if self.backend.is_none() {
            tracing::warn!("destroy failed: no session backend");
            self.events
                .emit(SessionEvent::DestroySessionComplete { success: false });
            return Err(SessionError::BackendUnavailable);
        }
        self.ensure_idle(OperationKind::Destroy)?;

        if let Err(error) = self.submit(OperationKind::Destroy, |backend, _, session_name| {
            backend.destroy_session(session_name)
        }) {
            tracing::warn!(
                session_name = %self.settings.session_name,
                "destroy session rejected"
            );
            self.events
                .emit(SessionEvent::DestroySessionComplete { success: false });
            return Err(error);
        }

        tracing::debug!(session_name = %self.settings.session_name, "destroy session submitted");
        Ok(())
    }

    /// Placeholder; starting a session has no effect yet.
    pub fn start_session(&self) -> Result<(), SessionError> {
        tracing::trace!(session_name = %self.settings.session_name, "start session ignored");
        Ok(())
    }

    pub fn on_create_complete(&mut self, session_name: &str, success: bool) {
        self.deregister(OperationKind::Create);

        self.events
            .emit(SessionEvent::CreateSessionComplete { success });
        tracing::info!(session_name, success, "completed creating session");
    }

    /// Empty result sets are always reported as a failed search.
    pub fn on_find_complete(&mut self, success: bool, mut results: Vec<SearchResult>) {
        self.deregister(OperationKind::Find);

        if let Some(search) = self.last_search.as_mut() {
            results.truncate(search.max_search_results as usize);
            search.results = results.clone();
        }

        if results.is_empty() {
            self.events.emit(SessionEvent::FindSessionsComplete {
                results,
                success: false,
            });
            tracing::info!(results = 0, success, "completed finding sessions, none found");
            return;
        }

        let found = results.len();
        self.events
            .emit(SessionEvent::FindSessionsComplete { results, success });
        tracing::info!(results = found, success, "completed finding sessions");
    }

    pub fn on_join_complete(&mut self, session_name: &str, result: JoinResult) {
        self.deregister(OperationKind::Join);

        self.events
            .emit(SessionEvent::JoinSessionComplete { result });
        tracing::info!(session_name, ?result, "completed joining session");
    }

    /// Replays a latched create before emitting the destroy event.
    pub fn on_destroy_complete(&mut self, session_name: &str, success: bool) {
        self.deregister(OperationKind::Destroy);

        match self.pending_create.take() {
            Some(pending) if success => {
                tracing::info!(
                    session_name,
                    num_public_connections = pending.num_public_connections,
                    match_type = %pending.match_type,
                    "re-creating session after destroy"
                );
                if let Err(error) =
                    self.create_session(pending.num_public_connections, &pending.match_type)
                {
                    tracing::warn!(%error, "re-create after destroy was not submitted");
                }
            }
            Some(pending) => {
                tracing::warn!(
                    session_name,
                    match_type = %pending.match_type,
                    "destroy failed, dropping pending re-create"
                );
            }
            None => {}
        }

        self.events
            .emit(SessionEvent::DestroySessionComplete { success });
        tracing::info!(session_name, success, "completed destroying session");
    }

    pub fn on_start_complete(&mut self, session_name: &str, success: bool) {
        tracing::trace!(session_name, success, "start session completion ignored");
    }

    /// Routes a backend completion to its handler. Completions for a kind
    /// with no registered listener are stale and dropped.
    pub fn dispatch(&mut self, completion: BackendCompletion) {
        let kind = completion.kind();
        if kind != OperationKind::Start && !self.registrations.contains_key(&kind) {
            tracing::debug!(%kind, "dropping completion without a registered listener");
            return;
        }

        match completion {
            BackendCompletion::Create {
                session_name,
                success,
            } => self.on_create_complete(&session_name, success),
            BackendCompletion::Find { success, results } => {
                self.on_find_complete(success, results)
            }
            BackendCompletion::Join {
                session_name,
                result,
            } => self.on_join_complete(&session_name, result),
            BackendCompletion::Destroy {
                session_name,
                success,
            } => self.on_destroy_complete(&session_name, success),
            BackendCompletion::Start {
                session_name,
                success,
            } => self.on_start_complete(&session_name, success),
        }
    }

    /// Handles every queued completion without waiting; returns how many
    /// were drained.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.dispatch(completion);
            drained += 1;
        }
        drained
    }

    /// Waits until a completion arrives, handles it and returns its kind.
    ///
    /// The coordinator keeps a sender of its own, so the queue never closes
    /// and this only returns once a backend delivers something.
    pub async fn next_completion(&mut self) -> OperationKind {
        let Some(completion) = self.completion_rx.recv().await else {
            return std::future::pending().await;
        };
        let kind = completion.kind();
        self.dispatch(completion);
        kind
    }

    /// Clears every outstanding listener and any latched re-create.
    pub fn shutdown(&mut self) {
        let kinds: Vec<OperationKind> = self.registrations.keys().copied().collect();
        for kind in kinds {
            self.deregister(kind);
        }
        self.pending_create = None;
    }

    fn does_session_exist(&self) -> bool {
        self.backend.as_ref().is_some_and(|backend| {
            backend
                .named_session(&self.settings.session_name)
                .is_some()
        })
    }

    fn is_lan(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|backend| backend.subsystem_name() == self.settings.null_subsystem_name)
    }

    fn build_session_settings(&self, num_public_connections: u32, match_type: &str) -> SessionSettings {
        let mut settings = SessionSettings {
            is_lan_match: self.is_lan(),
            num_public_connections,
            allow_join_in_progress: true,
            allow_join_via_presence: true,
            should_advertise: true,
            uses_presence: true,
            use_lobbies_if_available: true,
            build_unique_id: self.settings.build_unique_id,
            ..SessionSettings::default()
        };
        settings.set(
            MATCH_TYPE_KEY,
            match_type,
            AdvertisementType::ViaOnlineServiceAndPing,
        );
        settings
    }

    fn ensure_idle(&self, kind: OperationKind) -> Result<(), SessionError> {
        if self.registrations.contains_key(&kind) {
            tracing::debug!(%kind, "rejecting overlapping session operation");
            return Err(SessionError::OperationPending(kind));
        }
        Ok(())
    }

    // Registers the completion listener, then submits. A rejected
    // submission clears the listener again.
    fn submit<F>(&mut self, kind: OperationKind, request: F) -> Result<(), SessionError>
    where
        F: FnOnce(&B, &NetId, &str) -> bool,
    {
        let Some(backend) = self.backend.as_ref() else {
            return Err(SessionError::BackendUnavailable);
        };

        let handle = backend.add_completion_listener(kind, self.completion_tx.clone());
        self.registrations.insert(kind, handle);

        if request(backend, &self.local_player, &self.settings.session_name) {
            return Ok(());
        }

        self.registrations.remove(&kind);
        backend.clear_completion_listener(handle);
        Err(SessionError::SubmissionRejected(kind))
    }

    fn deregister(&mut self, kind: OperationKind) {
        let Some(handle) = self.registrations.remove(&kind) else {
            return;
        };
        if let Some(backend) = self.backend.as_ref() {
            if !backend.clear_completion_listener(handle) {
                tracing::debug!(%kind, handle = handle.id(), "listener was already cleared");
            }
        }
    }
}

impl<B: SessionBackend> Drop for SessionCoordinator<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
