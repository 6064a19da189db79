use glam::Vec2;

use crate::net::{EntityPayload, SpawnEntityPayload};
use crate::simulation::{CommandClock, Motion};
use crate::sync::Blend;

use super::entity::{AuthorityState, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no entity with id {0}")]
    NotFound(u16),
    #[error("no free entity slot")]
    SlotExhausted,
    #[error("entity {0} is already confirmed")]
    AlreadyConfirmed(u16),
    #[error("spawn request for entity {0} has non-finite values")]
    InvalidRequest(u16),
}

/// Fixed table of entity slots with ids `0..count`, identical on every
/// process.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new(count: u16) -> Self {
        Self {
            entities: (0..count).map(Entity::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn find(&self, id: u16) -> Result<&Entity, RegistryError> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn find_mut(&mut self, id: u16) -> Result<&mut Entity, RegistryError> {
        self.entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// First slot nobody has claimed yet.
    pub fn allocate_slot(&self) -> Result<u16, RegistryError> {
        self.entities
            .iter()
            .find(|e| e.state == AuthorityState::Unseen)
            .map(|e| e.id)
            .ok_or(RegistryError::SlotExhausted)
    }

    /// Marks an unused slot as a locally simulated ghost.
    pub fn predict(&mut self, id: u16, position: Vec2, direction: Vec2) -> Result<(), RegistryError> {
        let entity = self.find_mut(id)?;
        if entity.state == AuthorityState::Confirmed {
            return Err(RegistryError::AlreadyConfirmed(id));
        }
        entity.state = AuthorityState::Predicted;
        entity.position = position;
        entity.direction = direction;
        Ok(())
    }

    /// Frees a ghost whose request never left this process. Confirmed and
    /// unused slots are left as they are.
    pub fn retract(&mut self, id: u16) -> Result<bool, RegistryError> {
        let entity = self.find_mut(id)?;
        if entity.state != AuthorityState::Predicted {
            return Ok(false);
        }
        *entity = Entity::new(id);
        Ok(true)
    }

    /// Brings a slot under host authority at the given position.
    pub fn confirm(&mut self, id: u16, position: Vec2, direction: Vec2) -> Result<(), RegistryError> {
        let entity = self.find_mut(id)?;
        if entity.state == AuthorityState::Confirmed {
            return Err(RegistryError::AlreadyConfirmed(id));
        }
        entity.state = AuthorityState::Confirmed;
        entity.position = position;
        entity.direction = direction;
        Ok(())
    }

    /// Merges snapshot entries into the table. Confirmed entities move by
    /// `blend`; anything else adopts the snapshot position and becomes
    /// confirmed. Entities missing from the snapshot are left alone.
    pub fn apply_snapshot(&mut self, entities: &[EntityPayload], blend: Blend) -> usize {
        let mut applied = 0;
        for received in entities {
            let Ok(entity) = self.find_mut(received.id) else {
                log::trace!("Snapshot names unknown entity {}", received.id);
                continue;
            };

            if entity.is_confirmed() {
                entity.position = blend.vec2(entity.position, received.position);
            } else {
                entity.position = received.position;
                entity.state = AuthorityState::Confirmed;
            }
            applied += 1;
        }
        applied
    }

    /// Host side of a spawn: confirms the entity, then fast-forwards it by
    /// the frames `clock` has run since the request was made (at most
    /// `max_replay`).
    pub fn apply_spawn_request(
        &mut self,
        request: &SpawnEntityPayload,
        clock: &CommandClock,
        motion: &Motion,
        max_replay: u64,
    ) -> Result<u16, RegistryError> {
        if !request.position.is_finite() || !request.direction.is_finite() {
            return Err(RegistryError::InvalidRequest(request.id));
        }

        let id = request.id;
        self.confirm(id, request.position, request.direction.normalize_or_zero())?;

        let elapsed = clock.elapsed_since(request.command_frame);
        let replay = elapsed.min(max_replay);
        if replay < elapsed {
            log::debug!(
                "Spawn of entity {} is {} frames old, replaying {}",
                id,
                elapsed,
                replay
            );
        }

        let entity = self.find_mut(id)?;
        motion.replay(entity, replay);
        Ok(id)
    }

    /// Runs one tick of motion for every entity in `state`.
    pub fn advance(&mut self, state: AuthorityState, motion: &Motion) {
        for entity in self.entities.iter_mut().filter(|e| e.state == state) {
            motion.advance(entity);
        }
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_confirmed())
    }

    /// What a renderer draws: every confirmed or predicted entity.
    pub fn visible(&self) -> impl Iterator<Item = (u16, Vec2)> {
        self.entities
            .iter()
            .filter(|e| e.is_visible())
            .map(|e| (e.id, e.position))
    }

    pub fn to_payloads(&self) -> Vec<EntityPayload> {
        self.confirmed().map(Entity::to_payload).collect()
    }

    pub fn count(&self, state: AuthorityState) -> usize {
        self.entities.iter().filter(|e| e.state == state).count()
    }
}
