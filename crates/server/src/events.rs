use std::fmt;
use std::net::SocketAddr;

use ghostlink::{PeerId, RegistryError};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    PeerConnected {
        peer: PeerId,
        addr: SocketAddr,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    PeerRejected {
        addr: SocketAddr,
    },
    EntitySpawned {
        id: u16,
        origin: SpawnOrigin,
    },
    SpawnIgnored {
        origin: SpawnOrigin,
        reason: RegistryError,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOrigin {
    Local,
    Peer { peer: PeerId, command_frame: u64 },
}

impl fmt::Display for SpawnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnOrigin::Local => write!(f, "host"),
            SpawnOrigin::Peer {
                peer,
                command_frame,
            } => write!(f, "peer {} at frame {}", peer, command_frame),
        }
    }
}
