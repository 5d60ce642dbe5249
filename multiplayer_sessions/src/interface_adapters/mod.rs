// Interface adapters: concrete session backends behind the domain port.

pub mod lan;

pub use lan::{LanBackend, LanDirectory};
