// Framework bootstrap: tracing, config and a LAN session walkthrough.

use std::io::{Error, ErrorKind, Result};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::domain::{JoinResult, NetId, SessionBackend, SessionEvent};
use crate::frameworks::config::SessionsConfig;
use crate::interface_adapters::lan::{LanBackend, LanDirectory};
use crate::use_cases::SessionCoordinator;

// Session logs at info, everything else only when it warns.
const DEFAULT_LOG_FILTER: &str = "warn,multiplayer_sessions=info";

fn json_logs_requested(format: Option<&str>) -> bool {
    format.is_some_and(|format| format.trim().eq_ignore_ascii_case("json"))
}

fn init_runtime() {
    if let Err(error) = dotenvy::dotenv() {
        // Missing .env is the normal case outside local runs.
        if !error.not_found() {
            eprintln!("ignoring unreadable .env: {error}");
        }
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    // A second init (tests, embedding) keeps the first subscriber.
    let installed = if json_logs_requested(std::env::var("LOG_FORMAT").ok().as_deref()) {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "session runtime panicked");
    }));
}

/// What the LAN walkthrough observed.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkthroughReport {
    pub created: bool,
    pub sessions_found: usize,
    pub join_result: Option<JoinResult>,
    pub recreated: bool,
    pub destroyed: bool,
}

impl WalkthroughReport {
    /// Every step succeeded, including the guest joining the hosted session.
    pub fn is_success(&self) -> bool {
        self.created
            && self.join_result == Some(JoinResult::Success)
            && self.recreated
            && self.destroyed
    }
}

pub async fn run() -> Result<()> {
    init_runtime();

    let config = SessionsConfig::load()
        .map_err(|e| Error::other(format!("failed to load config: {e}")))?;
    tracing::debug!(?config, "configuration loaded");

    let report = run_lan_walkthrough(&config).await?;
    if !report.is_success() {
        tracing::error!(?report, "lan walkthrough failed");
        return Err(Error::other(format!("lan walkthrough failed: {report:?}")));
    }
    tracing::info!(?report, "lan walkthrough finished");
    Ok(())
}

/// Hosts a LAN session, finds and joins it from a second player, re-creates
/// it through recreate-on-destroy and tears both sides down.
pub async fn run_lan_walkthrough(config: &SessionsConfig) -> Result<WalkthroughReport> {
    let directory = LanDirectory::new();
    let timeout = config.completion_timeout();
    let backend = || {
        LanBackend::new(directory.clone()).with_subsystem_name(config.null_subsystem_name.clone())
    };

    let mut host = SessionCoordinator::new(
        Some(backend()),
        NetId::new("host"),
        config.coordinator_settings(),
    );
    let mut guest = SessionCoordinator::new(
        Some(backend()),
        NetId::new("guest"),
        config.coordinator_settings(),
    );
    let mut host_events = host.subscribe();
    let mut guest_events = guest.subscribe();

    host.create_session(
        config.default_public_connections,
        &config.default_match_type,
    )
    .map_err(Error::other)?;
    let created = matches!(
        settle(&mut host, &mut host_events, timeout).await?,
        SessionEvent::CreateSessionComplete { success: true }
    );
    tracing::info!(created, match_type = %config.default_match_type, "host session ready");

    guest
        .find_session(config.default_max_search_results)
        .map_err(Error::other)?;
    let results = match settle(&mut guest, &mut guest_events, timeout).await? {
        SessionEvent::FindSessionsComplete { results, .. } => results,
        other => return Err(unexpected(other)),
    };
    tracing::info!(sessions_found = results.len(), "guest search finished");

    let join_result = match results.first() {
        Some(result) => {
            guest.join_session(result).map_err(Error::other)?;
            match settle(&mut guest, &mut guest_events, timeout).await? {
                SessionEvent::JoinSessionComplete { result } => Some(result),
                other => return Err(unexpected(other)),
            }
        }
        None => None,
    };

    // The host slot is taken, so this destroys first and replays the create.
    host.create_session(
        config.default_public_connections,
        &config.default_match_type,
    )
    .map_err(Error::other)?;
    let destroyed_for_recreate = matches!(
        settle(&mut host, &mut host_events, timeout).await?,
        SessionEvent::DestroySessionComplete { success: true }
    );
    let recreated = destroyed_for_recreate
        && matches!(
            settle(&mut host, &mut host_events, timeout).await?,
            SessionEvent::CreateSessionComplete { success: true }
        );

    let mut destroyed = true;
    if join_result == Some(JoinResult::Success) {
        guest.destroy_session().map_err(Error::other)?;
        destroyed &= matches!(
            settle(&mut guest, &mut guest_events, timeout).await?,
            SessionEvent::DestroySessionComplete { success: true }
        );
    }
    host.destroy_session().map_err(Error::other)?;
    destroyed &= matches!(
        settle(&mut host, &mut host_events, timeout).await?,
        SessionEvent::DestroySessionComplete { success: true }
    );

    Ok(WalkthroughReport {
        created,
        sessions_found: results.len(),
        join_result,
        recreated,
        destroyed: destroyed && directory.is_empty(),
    })
}

// Drives completions until the coordinator emits its next event.
async fn settle<B: SessionBackend>(
    coordinator: &mut SessionCoordinator<B>,
    events: &mut broadcast::Receiver<SessionEvent>,
    timeout: Duration,
) -> Result<SessionEvent> {
    loop {
        match events.try_recv() {
            Ok(event) => return Ok(event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session events lagged");
                continue;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => return Err(Error::other("session events closed")),
        }

        let kind = tokio::time::timeout(timeout, coordinator.next_completion())
            .await
            .map_err(|_| Error::new(ErrorKind::TimedOut, "session completion timed out"))?;
        tracing::trace!(%kind, "completion handled");
    }
}

fn unexpected(event: SessionEvent) -> Error {
    Error::other(format!("unexpected session event: {event:?}"))
}
