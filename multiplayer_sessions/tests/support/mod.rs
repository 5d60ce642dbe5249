// Shared helpers for driving coordinators over the in-process LAN.
use multiplayer_sessions::{
    CoordinatorSettings, LanBackend, LanDirectory, NetId, SessionCoordinator, SessionEvent,
};
use tokio::sync::broadcast;

// Build a coordinator for `player` whose backend advertises into `directory`.
pub fn lan_coordinator(directory: &LanDirectory, player: &str) -> SessionCoordinator<LanBackend> {
    SessionCoordinator::new(
        Some(LanBackend::new(directory.clone())),
        NetId::new(player),
        CoordinatorSettings::default(),
    )
}

// Handle queued completions, then collect every event emitted so far.
pub fn settle(
    coordinator: &mut SessionCoordinator<LanBackend>,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Vec<SessionEvent> {
    coordinator.pump();
    let mut emitted = Vec::new();
    while let Ok(event) = events.try_recv() {
        emitted.push(event);
    }
    emitted
}
