mod client;
mod host;
mod peers;
mod protocol;
mod runtime;
mod stats;
mod transport;

pub use client::{ClientLink, DEFAULT_CONNECT_TIMEOUT};
pub use host::{DEFAULT_MAX_PEERS, HostEvent, HostLink, PEER_QUEUE_DEPTH};
pub use peers::{BroadcastReport, PeerId, PeerList};
pub use protocol::{
    CodecError, DEFAULT_PORT, DEFAULT_TICK_RATE, ENTITY_COUNT, ENTITY_PAYLOAD_SIZE, EntityPayload,
    GameStatePayload, HEADER_SIZE, MAX_MESSAGE_SIZE, PEER_LIMIT_NOTICE, SPAWN_PAYLOAD_SIZE,
    SpawnEntityPayload,
    decode_all, decode_game_state, decode_spawn_request,
};
pub use runtime::NetworkThread;
pub use stats::{LinkStats, NetworkStats};
pub use transport::TransportError;
