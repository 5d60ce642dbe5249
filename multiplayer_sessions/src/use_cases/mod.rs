// Use cases layer: the session lifecycle workflow and its event fan-out.

pub mod coordinator;
pub mod events;
#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{CoordinatorSettings, PendingCreate, SessionCoordinator};
pub use events::SessionEvents;
