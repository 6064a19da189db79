mod config;
mod motion;
mod tick;

pub use config::{DEFAULT_SEND_INTERVAL, MAX_BUFFERED_STATES, SimulationConfig};
pub use motion::{Arena, Motion};
pub use tick::{CommandClock, FixedTimestep};
