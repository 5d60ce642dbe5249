use tokio::sync::mpsc;

use crate::domain::events::{BackendCompletion, OperationKind};
use crate::domain::session::{NamedSession, NetId, SearchResult, SessionSearch, SessionSettings};

// Sender a backend uses to deliver completions to a registered listener.
pub type CompletionSender = mpsc::UnboundedSender<BackendCompletion>;

// Opaque handle correlating a registered completion listener with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelegateHandle(u64);

impl DelegateHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

// Port for the online session service the coordinator forwards to.
// Submissions return whether the request was accepted; accepted requests
// complete later through the listeners registered for their kind.
pub trait SessionBackend: Send + Sync {
    fn subsystem_name(&self) -> String;

    fn create_session(&self, host: &NetId, session_name: &str, settings: &SessionSettings)
        -> bool;

    fn find_sessions(&self, searcher: &NetId, search: &SessionSearch) -> bool;

    fn join_session(&self, player: &NetId, session_name: &str, result: &SearchResult) -> bool;

    fn destroy_session(&self, session_name: &str) -> bool;

    fn named_session(&self, session_name: &str) -> Option<NamedSession>;

    fn add_completion_listener(
        &self,
        kind: OperationKind,
        listener: CompletionSender,
    ) -> DelegateHandle;

    // Returns false when the handle was not registered.
    fn clear_completion_listener(&self, handle: DelegateHandle) -> bool;
}
