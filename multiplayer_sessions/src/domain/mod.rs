// Domain layer: session types, events and the backend port.

pub mod errors;
pub mod events;
pub mod ports;
pub mod session;

pub use errors::SessionError;
pub use events::{BackendCompletion, JoinResult, OperationKind, SessionEvent};
pub use ports::{CompletionSender, DelegateHandle, SessionBackend};
pub use session::{
    AdvertisementType, ComparisonOp, GAME_SESSION, MATCH_TYPE_KEY, NULL_SUBSYSTEM, NamedSession,
    NetId, QuerySetting, SEARCH_PRESENCE, SearchResult, SessionAttribute, SessionSearch,
    SessionSettings, SessionState,
};
