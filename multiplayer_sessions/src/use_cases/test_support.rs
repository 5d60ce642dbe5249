use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::domain::{
    BackendCompletion, CompletionSender, DelegateHandle, NamedSession, NetId, OperationKind,
    SearchResult, SessionBackend, SessionEvent, SessionSearch, SessionSettings, SessionState,
};

// Backend request observed by the recording double.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BackendCall {
    Create {
        host: NetId,
        session_name: String,
        settings: SessionSettings,
    },
    Find {
        searcher: NetId,
        search: SessionSearch,
    },
    Join {
        player: NetId,
        session_name: String,
        session_id: String,
    },
    Destroy {
        session_name: String,
    },
}

// Toggles used to simulate synchronous submission rejections.
#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub create: bool,
    pub find: bool,
    pub join: bool,
    pub destroy: bool,
}

#[derive(Default)]
struct Recorded {
    named_sessions: HashMap<String, NamedSession>,
    listeners: Vec<(DelegateHandle, OperationKind, CompletionSender)>,
    next_handle: u64,
    calls: Vec<BackendCall>,
    cleared: Vec<DelegateHandle>,
    watched_events: Option<broadcast::Receiver<SessionEvent>>,
    events_at_create: Vec<Vec<SessionEvent>>,
}

// Shared backend double for coordinator tests. Submissions are only
// recorded; tests deliver completions explicitly with `complete`.
#[derive(Clone)]
pub(crate) struct RecordingBackend {
    subsystem_name: String,
    recorded: Arc<Mutex<Recorded>>,
    failures: FailureFlags,
}

impl RecordingBackend {
    pub(crate) fn new(subsystem_name: impl Into<String>) -> Self {
        Self {
            subsystem_name: subsystem_name.into(),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn online() -> Self {
        Self::new("EOS")
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn insert_named_session(&self, session_name: &str) {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.named_sessions.insert(
            session_name.to_string(),
            NamedSession {
                session_name: session_name.to_string(),
                session_id: format!("{session_name}-id"),
                owner: NetId::new("player-1"),
                settings: SessionSettings::default(),
                registered_players: Vec::new(),
                state: SessionState::Pending,
            },
        );
    }

    pub(crate) fn remove_named_session(&self, session_name: &str) {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.named_sessions.remove(session_name);
    }

    pub(crate) fn calls(&self) -> Vec<BackendCall> {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.calls.clone()
    }

    pub(crate) fn listener_count(&self, kind: OperationKind) -> usize {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard
            .listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .count()
    }

    pub(crate) fn cleared_handles(&self) -> Vec<DelegateHandle> {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.cleared.clone()
    }

    // Every create submission snapshots the events the watched receiver has
    // seen so far, so tests can check what was emitted before the submit.
    pub(crate) fn watch_events(&self, events: broadcast::Receiver<SessionEvent>) {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.watched_events = Some(events);
    }

    pub(crate) fn events_at_create(&self) -> Vec<Vec<SessionEvent>> {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.events_at_create.clone()
    }

    // Deliver a completion to every listener registered for its kind.
    pub(crate) fn complete(&self, completion: BackendCompletion) -> usize {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        let kind = completion.kind();
        guard
            .listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .filter(|(_, _, sender)| sender.send(completion.clone()).is_ok())
            .count()
    }

    fn record(&self, call: BackendCall) {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.calls.push(call);
    }
}

impl SessionBackend for RecordingBackend {
    fn subsystem_name(&self) -> String {
        self.subsystem_name.clone()
    }

    fn create_session(
        &self,
        host: &NetId,
        session_name: &str,
        settings: &SessionSettings,
    ) -> bool {
        self.record(BackendCall::Create {
            host: host.clone(),
            session_name: session_name.to_string(),
            settings: settings.clone(),
        });
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        let recorded = &mut *guard;
        if let Some(events) = recorded.watched_events.as_mut() {
            let mut seen = Vec::new();
            while let Ok(event) = events.try_recv() {
                seen.push(event);
            }
            recorded.events_at_create.push(seen);
        }
        !self.failures.create
    }

    fn find_sessions(&self, searcher: &NetId, search: &SessionSearch) -> bool {
        self.record(BackendCall::Find {
            searcher: searcher.clone(),
            search: search.clone(),
        });
        !self.failures.find
    }

    fn join_session(&self, player: &NetId, session_name: &str, result: &SearchResult) -> bool {
        self.record(BackendCall::Join {
            player: player.clone(),
            session_name: session_name.to_string(),
            session_id: result.session_id.clone(),
        });
        !self.failures.join
    }

    fn destroy_session(&self, session_name: &str) -> bool {
        self.record(BackendCall::Destroy {
            session_name: session_name.to_string(),
        });
        !self.failures.destroy
    }

    fn named_session(&self, session_name: &str) -> Option<NamedSession> {
        let guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.named_sessions.get(session_name).cloned()
    }

    fn add_completion_listener(
        &self,
        kind: OperationKind,
        listener: CompletionSender,
    ) -> DelegateHandle {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        guard.next_handle += 1;
        let handle = DelegateHandle::new(guard.next_handle);
        guard.listeners.push((handle, kind, listener));
        handle
    }

    fn clear_completion_listener(&self, handle: DelegateHandle) -> bool {
        let mut guard = self.recorded.lock().expect("recorded mutex poisoned");
        let before = guard.listeners.len();
        guard.listeners.retain(|(registered, _, _)| *registered != handle);
        if guard.listeners.len() == before {
            return false;
        }
        guard.cleared.push(handle);
        true
    }
}
