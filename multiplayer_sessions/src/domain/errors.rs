use crate::domain::events::OperationKind;
use thiserror::Error;

// Synchronous outcome of a coordinator operation. Outward events are still
// the primary report; these only say why nothing was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session backend is unavailable")]
    BackendUnavailable,
    #[error("a {0} operation is already pending")]
    OperationPending(OperationKind),
    #[error("backend rejected the {0} request")]
    SubmissionRejected(OperationKind),
}
