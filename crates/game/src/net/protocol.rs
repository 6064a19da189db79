use bytemuck::{Pod, Zeroable};
use glam::Vec2;

pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Number of entity slots both roles allocate at startup.
pub const ENTITY_COUNT: u16 = 100;

/// Read/write buffer size used by both transports.
pub const MAX_MESSAGE_SIZE: usize = 2048;

/// Plain-text notice written to a connection the host turns away before
/// closing it.
pub const PEER_LIMIT_NOTICE: &[u8] = b"Max client reached";

pub const HEADER_SIZE: usize = size_of::<WireHeader>();
pub const ENTITY_PAYLOAD_SIZE: usize = size_of::<WireEntity>();
pub const SPAWN_PAYLOAD_SIZE: usize = size_of::<WireSpawn>();

const _: () = assert!(HEADER_SIZE + ENTITY_COUNT as usize * ENTITY_PAYLOAD_SIZE <= MAX_MESSAGE_SIZE);

// Fields are laid out in declaration order, host byte order.

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct WireHeader {
    command_frame: u64,
    avatar_position: [f32; 2],
    avatar_angle: f32,
    entity_count: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct WireEntity {
    id: u16,
    position: [f32; 2],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct WireSpawn {
    command_frame: u64,
    id: u16,
    position: [f32; 2],
    direction: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall { required: usize, available: usize },
    #[error("malformed message: {required} bytes declared, {received} received")]
    MalformedMessage { required: usize, received: usize },
    #[error("entity count {count} exceeds maximum of {max}")]
    EntityCountOutOfRange { count: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityPayload {
    pub id: u16,
    pub position: Vec2,
}

impl EntityPayload {
    pub fn new(id: u16, position: Vec2) -> Self {
        Self { id, position }
    }
}

/// Authoritative snapshot broadcast by the host.
///
/// The wire `entity_count` is always derived from `entities.len()`, so the
/// two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStatePayload {
    pub command_frame: u64,
    pub avatar_position: Vec2,
    pub avatar_angle: f32,
    pub entities: Vec<EntityPayload>,
}

impl GameStatePayload {
    pub fn new(command_frame: u64, avatar_position: Vec2, avatar_angle: f32) -> Self {
        Self {
            command_frame,
            avatar_position,
            avatar_angle,
            entities: Vec::new(),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.entities.len() * ENTITY_PAYLOAD_SIZE
    }

    /// Writes the payload to the front of `buf` and returns the number of
    /// bytes written. Nothing is written when the buffer is too small.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let count = self.entities.len();
        if count > ENTITY_COUNT as usize {
            return Err(CodecError::EntityCountOutOfRange {
                count,
                max: ENTITY_COUNT as usize,
            });
        }

        let required = self.encoded_len();
        if buf.len() < required {
            return Err(CodecError::BufferTooSmall {
                required,
                available: buf.len(),
            });
        }

        let header = WireHeader {
            command_frame: self.command_frame,
            avatar_position: self.avatar_position.to_array(),
            avatar_angle: self.avatar_angle,
            entity_count: count as u32,
        };
        buf[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));

        let body = &mut buf[HEADER_SIZE..required];
        for (chunk, entity) in body
            .chunks_exact_mut(ENTITY_PAYLOAD_SIZE)
            .zip(&self.entities)
        {
            let wire = WireEntity {
                id: entity.id,
                position: entity.position.to_array(),
            };
            chunk.copy_from_slice(bytemuck::bytes_of(&wire));
        }

        Ok(required)
    }

    /// Parses one payload from the front of `bytes`. Trailing bytes past
    /// `encoded_len()` are left for the caller.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::MalformedMessage {
                required: HEADER_SIZE,
                received: bytes.len(),
            });
        }

        let header: WireHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
        let count = header.entity_count as usize;
        if count > ENTITY_COUNT as usize {
            return Err(CodecError::EntityCountOutOfRange {
                count,
                max: ENTITY_COUNT as usize,
            });
        }

        let required = HEADER_SIZE + count * ENTITY_PAYLOAD_SIZE;
        if bytes.len() < required {
            return Err(CodecError::MalformedMessage {
                required,
                received: bytes.len(),
            });
        }

        let entities = bytes[HEADER_SIZE..required]
            .chunks_exact(ENTITY_PAYLOAD_SIZE)
            .map(|chunk| {
                let wire: WireEntity = bytemuck::pod_read_unaligned(chunk);
                EntityPayload {
                    id: wire.id,
                    position: Vec2::from_array(wire.position),
                }
            })
            .collect();

        Ok(Self {
            command_frame: header.command_frame,
            avatar_position: Vec2::from_array(header.avatar_position),
            avatar_angle: header.avatar_angle,
            entities,
        })
    }
}

/// Request from a participant to bring an entity slot to life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnEntityPayload {
    pub command_frame: u64,
    pub id: u16,
    pub position: Vec2,
    pub direction: Vec2,
}

impl SpawnEntityPayload {
    pub const ENCODED_LEN: usize = SPAWN_PAYLOAD_SIZE;

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(CodecError::BufferTooSmall {
                required: Self::ENCODED_LEN,
                available: buf.len(),
            });
        }

        let wire = WireSpawn {
            command_frame: self.command_frame,
            id: self.id,
            position: self.position.to_array(),
            direction: self.direction.to_array(),
        };
        buf[..Self::ENCODED_LEN].copy_from_slice(bytemuck::bytes_of(&wire));
        Ok(Self::ENCODED_LEN)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(CodecError::MalformedMessage {
                required: Self::ENCODED_LEN,
                received: bytes.len(),
            });
        }

        let wire: WireSpawn = bytemuck::pod_read_unaligned(&bytes[..Self::ENCODED_LEN]);
        Ok(Self {
            command_frame: wire.command_frame,
            id: wire.id,
            position: Vec2::from_array(wire.position),
            direction: Vec2::from_array(wire.direction),
        })
    }
}

/// Splits one read into consecutive messages. Stops at the first message
/// that fails to decode and reports it; bytes after it are discarded.
pub fn decode_all<T>(
    mut bytes: &[u8],
    decode: impl Fn(&[u8]) -> Result<(T, usize), CodecError>,
) -> (Vec<T>, Option<CodecError>) {
    let mut messages = Vec::new();
    while !bytes.is_empty() {
        match decode(bytes) {
            Ok((message, consumed)) => {
                messages.push(message);
                bytes = &bytes[consumed..];
            }
            Err(e) => return (messages, Some(e)),
        }
    }
    (messages, None)
}

pub fn decode_game_state(bytes: &[u8]) -> Result<(GameStatePayload, usize), CodecError> {
    GameStatePayload::decode(bytes).map(|payload| {
        let len = payload.encoded_len();
        (payload, len)
    })
}

pub fn decode_spawn_request(bytes: &[u8]) -> Result<(SpawnEntityPayload, usize), CodecError> {
    SpawnEntityPayload::decode(bytes).map(|payload| (payload, SpawnEntityPayload::ENCODED_LEN))
}
