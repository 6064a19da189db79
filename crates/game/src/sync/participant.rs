use glam::Vec2;

use crate::net::SpawnEntityPayload;
use crate::simulation::{CommandClock, Motion, SimulationConfig};
use crate::snapshot::{AuthorityState, Avatar, EntityRegistry, RegistryError, SharedStateBuffer};

use super::interpolation::Interpolator;

/// Client-side simulation: predicts its own spawns and reconciles against
/// host snapshots arriving in the shared buffer.
#[derive(Debug)]
pub struct Participant {
    config: SimulationConfig,
    registry: EntityRegistry,
    avatar: Avatar,
    clock: CommandClock,
    motion: Motion,
    interpolator: Interpolator,
    states: SharedStateBuffer,
}

impl Participant {
    pub fn new(config: SimulationConfig, states: SharedStateBuffer) -> Self {
        Self {
            registry: EntityRegistry::new(config.entity_count),
            avatar: Avatar::centered(&config.arena),
            clock: CommandClock::new(),
            motion: config.motion(),
            interpolator: Interpolator::from_config(&config),
            states,
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

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    pub fn states(&self) -> &SharedStateBuffer {
        &self.states
    }

    /// Claims a free slot as a ghost and builds the request to send to the
    /// host. The ghost moves locally until a snapshot confirms it.
    pub fn request_spawn(
        &mut self,
        position: Vec2,
        direction: Vec2,
    ) -> Result<SpawnEntityPayload, RegistryError> {
        let id = self.registry.allocate_slot()?;
        let position = self.config.arena.clamp(position);
        let direction = direction.normalize_or_zero();
        self.registry.predict(id, position, direction)?;

        Ok(SpawnEntityPayload {
            command_frame: self.clock.frame(),
            id,
            position,
            direction,
        })
    }

    /// Drops the ghost created for a request that could not be sent, so
    /// its slot can be claimed again.
    pub fn cancel_spawn(&mut self, id: u16) -> Result<bool, RegistryError> {
        let retracted = self.registry.retract(id)?;
        if retracted {
            log::debug!("Retracted ghost {}", id);
        }
        Ok(retracted)
    }

    /// Advances one fixed tick: dead-reckons ghosts, then blends toward the
    /// oldest buffered snapshot, adopting its command frame.
    pub fn tick(&mut self) {
        self.clock.advance();
        self.registry
            .advance(AuthorityState::Predicted, &self.motion);

        if let Some(target) = self.states.front() {
            self.clock.resync(target.command_frame);
            self.interpolator
                .apply(&target, &mut self.avatar, &mut self.registry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{EntityPayload, GameStatePayload};

    fn participant() -> Participant {
        Participant::new(SimulationConfig::default(), SharedStateBuffer::default())
    }

    #[test]
    fn test_spawn_request_claims_first_free_slot() {
        let mut participant = participant();
        for _ in 0..3 {
            participant.tick();
        }

        let request = participant
            .request_spawn(Vec2::new(10.0, 10.0), Vec2::new(0.0, 5.0))
            .unwrap();
        assert_eq!(request.id, 0);
        assert_eq!(request.command_frame, 3);
        assert_eq!(request.direction, Vec2::new(0.0, 1.0));

        let second = participant.request_spawn(Vec2::ONE, Vec2::X).unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(participant.registry().count(AuthorityState::Predicted), 2);
    }

    #[test]
    fn test_ghosts_dead_reckon_until_confirmed() {
        let mut participant = participant();
        participant
            .request_spawn(Vec2::new(100.0, 100.0), Vec2::X)
            .unwrap();

        for _ in 0..6 {
            participant.tick();
        }
        let ghost = participant.registry().find(0).unwrap();
        assert_eq!(ghost.state, AuthorityState::Predicted);
        assert!((ghost.position.x - 120.0).abs() < 1e-3);

        let mut snapshot = GameStatePayload::new(40, Vec2::ZERO, 0.0);
        snapshot
            .entities
            .push(EntityPayload::new(0, Vec2::new(125.0, 100.0)));
        participant.states().push(snapshot);
        participant.tick();

        let confirmed = participant.registry().find(0).unwrap();
        assert_eq!(confirmed.state, AuthorityState::Confirmed);
        assert_eq!(confirmed.position, Vec2::new(125.0, 100.0));

        // Confirmed entities no longer move on their own.
        participant.states().clear();
        participant.tick();
        assert_eq!(
            participant.registry().find(0).unwrap().position,
            Vec2::new(125.0, 100.0)
        );
    }

    #[test]
    fn test_clock_follows_front_snapshot() {
        let mut participant = participant();
        participant.tick();
        assert_eq!(participant.clock().frame(), 1);

        participant
            .states()
            .push(GameStatePayload::new(600, Vec2::ZERO, 0.0));
        participant.tick();
        assert_eq!(participant.clock().frame(), 600);

        // The front stays the target until evicted.
        participant.tick();
        assert_eq!(participant.clock().frame(), 600);
        assert_eq!(participant.states().len(), 1);
    }

    #[test]
    fn test_cancelled_spawn_frees_the_slot() {
        let config = SimulationConfig {
            entity_count: 1,
            ..Default::default()
        };
        let mut participant = Participant::new(config, SharedStateBuffer::default());
        let request = participant.request_spawn(Vec2::ONE, Vec2::X).unwrap();

        assert_eq!(participant.cancel_spawn(request.id), Ok(true));
        assert_eq!(participant.registry().count(AuthorityState::Predicted), 0);
        for _ in 0..10 {
            participant.tick();
        }
        assert_eq!(participant.registry().count(AuthorityState::Unseen), 1);

        let again = participant.request_spawn(Vec2::ONE, Vec2::X).unwrap();
        assert_eq!(again.id, request.id);
    }

    #[test]
    fn test_exhausted_registry_refuses_spawn() {
        let config = SimulationConfig {
            entity_count: 1,
            ..Default::default()
        };
        let mut participant = Participant::new(config, SharedStateBuffer::default());
        participant.request_spawn(Vec2::ONE, Vec2::X).unwrap();
        assert_eq!(
            participant.request_spawn(Vec2::ONE, Vec2::X),
            Err(RegistryError::SlotExhausted)
        );
    }
}
