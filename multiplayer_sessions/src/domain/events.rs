// Operation kinds, backend completions and outward session events.

use crate::domain::session::SearchResult;
use serde::{Deserialize, Serialize};

/// Kind of asynchronous session operation submitted to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Find,
    Join,
    Destroy,
    Start,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Find => "find",
            OperationKind::Join => "join",
            OperationKind::Destroy => "destroy",
            OperationKind::Start => "start",
        };
        f.write_str(name)
    }
}

/// Categorical outcome of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResult {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

/// Completion signal a backend delivers for an accepted operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCompletion {
    Create {
        session_name: String,
        success: bool,
    },
    Find {
        success: bool,
        results: Vec<SearchResult>,
    },
    Join {
        session_name: String,
        result: JoinResult,
    },
    Destroy {
        session_name: String,
        success: bool,
    },
    Start {
        session_name: String,
        success: bool,
    },
}

impl BackendCompletion {
    pub fn kind(&self) -> OperationKind {
        match self {
            BackendCompletion::Create { .. } => OperationKind::Create,
            BackendCompletion::Find { .. } => OperationKind::Find,
            BackendCompletion::Join { .. } => OperationKind::Join,
            BackendCompletion::Destroy { .. } => OperationKind::Destroy,
            BackendCompletion::Start { .. } => OperationKind::Start,
        }
    }
}

/// Notification fanned out to game code once an operation settles.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CreateSessionComplete { success: bool },
    FindSessionsComplete {
        results: Vec<SearchResult>,
        success: bool,
    },
    JoinSessionComplete { result: JoinResult },
    DestroySessionComplete { success: bool },
}
