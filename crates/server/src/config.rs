use ghostlink::{DEFAULT_MAX_PEERS, DEFAULT_PORT, SimulationConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_peers: usize,
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_peers: DEFAULT_MAX_PEERS,
            simulation: SimulationConfig::default(),
        }
    }
}
