// Fan-out of settled session operations to game code.

use crate::domain::SessionEvent;
use tokio::sync::broadcast;

/// Broadcast hub for outward session events.
///
/// Subscribing hands out a receiver; dropping the receiver unsubscribes.
/// All event kinds share one channel so subscribers observe them in the
/// order they were emitted.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // Sending only fails when nobody is subscribed.
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            tracing::trace!(?event, "no session event subscribers");
        }
    }
}
