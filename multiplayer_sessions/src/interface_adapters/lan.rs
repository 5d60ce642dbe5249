// In-process LAN session backend. Reports the NULL subsystem, so the
// coordinator builds LAN sessions and LAN queries against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::domain::{
    BackendCompletion, CompletionSender, DelegateHandle, JoinResult, NULL_SUBSYSTEM, NamedSession,
    NetId, OperationKind, SearchResult, SessionBackend, SessionSearch, SessionSettings,
    SessionState,
};

#[derive(Debug, Clone)]
struct AdvertisedSession {
    session_id: String,
    owner: NetId,
    settings: SessionSettings,
    players: Vec<NetId>,
}

impl AdvertisedSession {
    fn open_public_connections(&self) -> u32 {
        let taken = u32::try_from(self.players.len()).unwrap_or(u32::MAX);
        self.settings.num_public_connections.saturating_sub(taken)
    }

    fn to_search_result(&self) -> SearchResult {
        SearchResult {
            session_id: self.session_id.clone(),
            owner: self.owner.clone(),
            ping_ms: 0,
            open_public_connections: self.open_public_connections(),
            settings: self.settings.clone(),
        }
    }
}

/// Registry of advertised sessions shared by every LAN backend in the
/// process. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct LanDirectory {
    sessions: Arc<Mutex<Vec<AdvertisedSession>>>,
}

impl LanDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of advertised sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AdvertisedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advertise(&self, session: AdvertisedSession) {
        self.lock().push(session);
    }

    fn withdraw(&self, session_id: &str) {
        self.lock().retain(|session| session.session_id != session_id);
    }

    // Advertised sessions matching the search, oldest first.
    fn search(&self, searcher: &NetId, search: &SessionSearch) -> Vec<SearchResult> {
        self.lock()
            .iter()
            .filter(|session| &session.owner != searcher)
            .filter(|session| search.accepts(&session.settings))
            .take(search.max_search_results as usize)
            .map(AdvertisedSession::to_search_result)
            .collect()
    }

    fn claim_seat(&self, session_id: &str, player: &NetId) -> Result<AdvertisedSession, JoinResult> {
        let mut sessions = self.lock();
        let Some(session) = sessions
            .iter_mut()
            .find(|session| session.session_id == session_id)
        else {
            return Err(JoinResult::SessionDoesNotExist);
        };
        if session.open_public_connections() == 0 {
            return Err(JoinResult::SessionIsFull);
        }
        session.players.push(player.clone());
        Ok(session.clone())
    }

    fn release_seat(&self, session_id: &str, player: &NetId) {
        let mut sessions = self.lock();
        if let Some(session) = sessions
            .iter_mut()
            .find(|session| session.session_id == session_id)
        {
            session.players.retain(|seated| seated != player);
        }
    }
}

#[derive(Debug, Clone)]
enum LocalRole {
    Host,
    Guest(NetId),
}

struct LocalSession {
    session: NamedSession,
    role: LocalRole,
}

struct LanState {
    directory: LanDirectory,
    named_sessions: HashMap<String, LocalSession>,
    listeners: Vec<(DelegateHandle, OperationKind, CompletionSender)>,
    next_handle: u64,
}

impl LanState {
    fn notify(&self, completion: BackendCompletion) {
        let kind = completion.kind();
        for (handle, _, listener) in self
            .listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
        {
            if listener.send(completion.clone()).is_err() {
                tracing::debug!(%kind, handle = handle.id(), "completion listener closed");
            }
        }
    }

    // Hosted sessions leave the directory, joined ones give their seat back.
    fn leave(&self, local: &LocalSession) {
        match &local.role {
            LocalRole::Host => self.directory.withdraw(&local.session.session_id),
            LocalRole::Guest(player) => {
                self.directory.release_seat(&local.session.session_id, player)
            }
        }
    }
}

// Runs once the last backend clone is gone.
impl Drop for LanState {
    fn drop(&mut self) {
        for (session_name, local) in std::mem::take(&mut self.named_sessions) {
            self.leave(&local);
            tracing::debug!(%session_name, session_id = %local.session.session_id, "lan session abandoned");
        }
    }
}

/// Session backend for one local player on the in-process LAN.
///
/// Completions are delivered immediately to the registered listeners, so
/// they are queued by the time a submission returns. Dropping the last
/// clone withdraws the sessions it still hosts and frees the seats it holds.
#[derive(Clone)]
pub struct LanBackend {
    directory: LanDirectory,
    subsystem_name: String,
    state: Arc<Mutex<LanState>>,
}

impl LanBackend {
    pub fn new(directory: LanDirectory) -> Self {
        let state = LanState {
            directory: directory.clone(),
            named_sessions: HashMap::new(),
            listeners: Vec::new(),
            next_handle: 0,
        };
        Self {
            directory,
            subsystem_name: NULL_SUBSYSTEM.to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Reports `name` as the subsystem instead of `NULL`. Coordinators
    /// configured with the same offline name keep treating it as LAN.
    pub fn with_subsystem_name(mut self, name: impl Into<String>) -> Self {
        self.subsystem_name = name.into();
        self
    }

    pub fn directory(&self) -> &LanDirectory {
        &self.directory
    }

    fn lock(&self) -> MutexGuard<'_, LanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionBackend for LanBackend {
    fn subsystem_name(&self) -> String {
        self.subsystem_name.clone()
    }

    fn create_session(
        &self,
        host: &NetId,
        session_name: &str,
        settings: &SessionSettings,
    ) -> bool {
        let mut state = self.lock();
        if state.named_sessions.contains_key(session_name) {
            tracing::warn!(session_name, "cannot create session, name already in use");
            return false;
        }

        let session_id = Uuid::new_v4().to_string();
        if settings.should_advertise {
            self.directory.advertise(AdvertisedSession {
                session_id: session_id.clone(),
                owner: host.clone(),
                settings: settings.clone(),
                players: Vec::new(),
            });
        }

        state.named_sessions.insert(
            session_name.to_string(),
            LocalSession {
                session: NamedSession {
                    session_name: session_name.to_string(),
                    session_id: session_id.clone(),
                    owner: host.clone(),
                    settings: settings.clone(),
                    registered_players: vec![host.clone()],
                    state: SessionState::Pending,
                },
                role: LocalRole::Host,
            },
        );
        tracing::debug!(session_name, %session_id, %host, "lan session created");

        state.notify(BackendCompletion::Create {
            session_name: session_name.to_string(),
            success: true,
        });
        true
    }

    fn find_sessions(&self, searcher: &NetId, search: &SessionSearch) -> bool {
        let state = self.lock();
        if !search.is_lan_query {
            tracing::warn!(%searcher, "lan backend only answers lan queries");
            state.notify(BackendCompletion::Find {
                success: false,
                results: Vec::new(),
            });
            return true;
        }

        let results = self.directory.search(searcher, search);
        tracing::debug!(%searcher, results = results.len(), "lan search finished");
        state.notify(BackendCompletion::Find {
            success: true,
            results,
        });
        true
    }

    fn join_session(&self, player: &NetId, session_name: &str, result: &SearchResult) -> bool {
        let mut state = self.lock();
        let outcome = if state.named_sessions.contains_key(session_name) {
            JoinResult::AlreadyInSession
        } else {
            match self.directory.claim_seat(&result.session_id, player) {
                Ok(advertised) => {
                    let mut registered_players = vec![advertised.owner.clone()];
                    registered_players.extend(advertised.players.iter().cloned());
                    state.named_sessions.insert(
                        session_name.to_string(),
                        LocalSession {
                            session: NamedSession {
                                session_name: session_name.to_string(),
                                session_id: advertised.session_id,
                                owner: advertised.owner,
                                settings: advertised.settings,
                                registered_players,
                                state: SessionState::Pending,
                            },
                            role: LocalRole::Guest(player.clone()),
                        },
                    );
                    JoinResult::Success
                }
                Err(failure) => failure,
            }
        };
        tracing::debug!(session_name, session_id = %result.session_id, ?outcome, "lan join finished");

        state.notify(BackendCompletion::Join {
            session_name: session_name.to_string(),
            result: outcome,
        });
        true
    }

    fn destroy_session(&self, session_name: &str) -> bool {
        let mut state = self.lock();
        let Some(local) = state.named_sessions.remove(session_name) else {
            tracing::debug!(session_name, "no lan session to destroy");
            return false;
        };

        state.leave(&local);
        tracing::debug!(session_name, session_id = %local.session.session_id, "lan session destroyed");

        state.notify(BackendCompletion::Destroy {
            session_name: session_name.to_string(),
            success: true,
        });
        true
    }

    fn named_session(&self, session_name: &str) -> Option<NamedSession> {
        self.lock()
            .named_sessions
            .get(session_name)
            .map(|local| local.session.clone())
    }

    fn add_completion_listener(
        &self,
        kind: OperationKind,
        listener: CompletionSender,
    ) -> DelegateHandle {
        let mut state = self.lock();
        state.next_handle += 1;
        let handle = DelegateHandle::new(state.next_handle);
        state.listeners.push((handle, kind, listener));
        handle
    }

    fn clear_completion_listener(&self, handle: DelegateHandle) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(registered, _, _)| *registered != handle);
        state.listeners.len() != before
    }
}
