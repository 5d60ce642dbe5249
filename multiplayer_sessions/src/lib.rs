pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::{JoinResult, NetId, SessionBackend, SessionError, SessionEvent};
pub use frameworks::config::SessionsConfig;
pub use frameworks::runtime::{WalkthroughReport, run, run_lan_walkthrough};
pub use interface_adapters::{LanBackend, LanDirectory};
pub use use_cases::{CoordinatorSettings, SessionCoordinator};
