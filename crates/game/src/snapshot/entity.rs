use glam::Vec2;

use crate::net::EntityPayload;

/// Who currently owns an entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorityState {
    /// Slot not in use.
    #[default]
    Unseen,
    /// Spawned locally by a participant, not yet acknowledged by the host.
    Predicted,
    /// Owned by the host; participants only blend toward snapshot data.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u16,
    pub state: AuthorityState,
    pub position: Vec2,
    pub direction: Vec2,
}

impl Entity {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            state: AuthorityState::Unseen,
            position: Vec2::ZERO,
            direction: Vec2::ZERO,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == AuthorityState::Confirmed
    }

    pub fn is_visible(&self) -> bool {
        self.state != AuthorityState::Unseen
    }

    pub fn to_payload(&self) -> EntityPayload {
        EntityPayload::new(self.id, self.position)
    }
}
