pub mod net;
pub mod simulation;
pub mod snapshot;
pub mod sync;

pub use net::{
    BroadcastReport, ClientLink, CodecError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_PEERS,
    DEFAULT_PORT, DEFAULT_TICK_RATE, ENTITY_COUNT, EntityPayload, GameStatePayload, HostEvent,
    HostLink, MAX_MESSAGE_SIZE, NetworkStats, NetworkThread, PeerId, SpawnEntityPayload,
    TransportError,
};
pub use simulation::{Arena, CommandClock, FixedTimestep, Motion, SimulationConfig};
pub use snapshot::{
    AuthorityState, Avatar, Entity, EntityRegistry, RegistryError, SharedStateBuffer, StateBuffer,
};
pub use sync::{Authority, Blend, InterpolationMode, Interpolator, Participant};
