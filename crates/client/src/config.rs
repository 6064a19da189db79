use std::time::Duration;

use ghostlink::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, SimulationConfig};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    pub connect_timeout: Duration,
    /// Request a spawn this often without user input.
    pub auto_spawn: Option<Duration>,
    pub simulation: SimulationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auto_spawn: None,
            simulation: SimulationConfig::default(),
        }
    }
}
