// Session slot, search and result types shared by the coordinator and backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Well-known name of the single game session slot.
pub const GAME_SESSION: &str = "GameSession";
/// Subsystem name reported by the offline, in-process backend.
pub const NULL_SUBSYSTEM: &str = "NULL";
/// Custom attribute key carrying the match type tag.
pub const MATCH_TYPE_KEY: &str = "MatchType";
/// Query key filtering sessions by presence support.
pub const SEARCH_PRESENCE: &str = "PRESENCESEARCH";

/// Network identity of the local player issuing session requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetId(pub String);

impl NetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a custom session attribute is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvertisementType {
    DontAdvertise,
    ViaPingOnly,
    ViaOnlineService,
    ViaOnlineServiceAndPing,
}

/// Custom key/value pair attached to session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAttribute {
    pub value: Value,
    pub advertisement: AdvertisementType,
}

/// Settings a session is created with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub is_lan_match: bool,
    pub num_public_connections: u32,
    pub allow_join_in_progress: bool,
    pub allow_join_via_presence: bool,
    pub should_advertise: bool,
    pub uses_presence: bool,
    pub use_lobbies_if_available: bool,
    /// Sessions only match searchers built with the same id.
    pub build_unique_id: u32,
    pub attributes: HashMap<String, SessionAttribute>,
}

impl SessionSettings {
    /// Sets or replaces a custom attribute.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        advertisement: AdvertisementType,
    ) {
        self.attributes.insert(
            key.into(),
            SessionAttribute {
                value: value.into(),
                advertisement,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).map(|attribute| &attribute.value)
    }

    /// Match type tag, when the session advertises one.
    pub fn match_type(&self) -> Option<&str> {
        self.get(MATCH_TYPE_KEY).and_then(Value::as_str)
    }
}

/// Comparison applied by a search query setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
}

impl ComparisonOp {
    pub fn matches(self, actual: &Value, expected: &Value) -> bool {
        match self {
            ComparisonOp::Equals => actual == expected,
            ComparisonOp::NotEquals => actual != expected,
        }
    }
}

/// Single filter of a session search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySetting {
    pub key: String,
    pub value: Value,
    pub op: ComparisonOp,
}

impl QuerySetting {
    /// Filter restricting results to presence-enabled sessions.
    pub fn presence() -> Self {
        Self {
            key: SEARCH_PRESENCE.to_string(),
            value: Value::Bool(true),
            op: ComparisonOp::Equals,
        }
    }
}

/// A session discovered by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub session_id: String,
    pub owner: NetId,
    pub ping_ms: u32,
    pub open_public_connections: u32,
    pub settings: SessionSettings,
}

impl SearchResult {
    pub fn match_type(&self) -> Option<&str> {
        self.settings.match_type()
    }
}

/// Search request and, once it completes, its result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSearch {
    pub max_search_results: u32,
    pub is_lan_query: bool,
    /// Build id of the searcher; sessions from other builds stay hidden.
    pub build_unique_id: u32,
    pub query_settings: Vec<QuerySetting>,
    pub results: Vec<SearchResult>,
}

impl SessionSearch {
    /// Returns true when the session comes from the searcher's build and
    /// every query setting accepts its settings.
    pub fn accepts(&self, settings: &SessionSettings) -> bool {
        if settings.build_unique_id != self.build_unique_id {
            return false;
        }
        self.query_settings.iter().all(|query| {
            let actual = if query.key == SEARCH_PRESENCE {
                Value::Bool(settings.uses_presence)
            } else {
                match settings.get(&query.key) {
                    Some(value) => value.clone(),
                    None => return false,
                }
            };
            query.op.matches(&actual, &query.value)
        })
    }
}

/// Lifecycle stage of a named session on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Pending,
    InProgress,
    Ended,
}

/// A session the backend currently tracks under a local name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSession {
    pub session_name: String,
    pub session_id: String,
    pub owner: NetId,
    pub settings: SessionSettings,
    pub registered_players: Vec<NetId>,
    pub state: SessionState,
}
