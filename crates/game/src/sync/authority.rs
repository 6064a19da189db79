use glam::Vec2;

use crate::net::{GameStatePayload, SpawnEntityPayload};
use crate::simulation::{CommandClock, Motion, SimulationConfig};
use crate::snapshot::{AuthorityState, Avatar, EntityRegistry, RegistryError};

/// Host-side simulation: owns the ground truth and decides when a snapshot
/// is due.
#[derive(Debug)]
pub struct Authority {
    config: SimulationConfig,
    registry: EntityRegistry,
    avatar: Avatar,
    clock: CommandClock,
    motion: Motion,
    frames_per_packet: u64,
}

impl Authority {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            registry: EntityRegistry::new(config.entity_count),
            avatar: Avatar::centered(&config.arena),
            clock: CommandClock::new(),
            motion: config.motion(),
            frames_per_packet: config.frames_per_packet() as u64,
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn clock(&self) -> &CommandClock {
        &self.clock
    }

    /// Feeds one tick worth of avatar input.
    pub fn steer(&mut self, turn: f32, throttle: f32) {
        self.avatar
            .steer(turn, throttle, self.config.dt(), &self.config);
    }

    /// Spawns an entity owned by the host itself, in the first free slot.
    pub fn spawn_local(&mut self, position: Vec2, direction: Vec2) -> Result<u16, RegistryError> {
        let id = self.registry.allocate_slot()?;
        self.registry.confirm(
            id,
            self.config.arena.clamp(position),
            direction.normalize_or_zero(),
        )?;
        Ok(id)
    }

    /// Confirms a participant's spawn, compensating for the frames the
    /// request spent in flight.
    pub fn handle_spawn_request(
        &mut self,
        request: &SpawnEntityPayload,
    ) -> Result<u16, RegistryError> {
        let id = self.registry.apply_spawn_request(
            request,
            &self.clock,
            &self.motion,
            self.config.max_replay_frames,
        )?;
        log::debug!(
            "Confirmed entity {} requested at frame {} (now {})",
            id,
            request.command_frame,
            self.clock.frame()
        );
        Ok(id)
    }

    /// Advances one fixed tick. Returns a snapshot when one is due.
    pub fn tick(&mut self) -> Option<GameStatePayload> {
        self.registry
            .advance(AuthorityState::Confirmed, &self.motion);
        let frame = self.clock.advance();

        (frame % self.frames_per_packet == 0).then(|| self.build_snapshot())
    }

    /// Every confirmed entity plus the avatar pose at the current frame.
    pub fn build_snapshot(&self) -> GameStatePayload {
        GameStatePayload {
            command_frame: self.clock.frame(),
            avatar_position: self.avatar.position,
            avatar_angle: self.avatar.angle,
            entities: self.registry.to_payloads(),
        }
    }
}
