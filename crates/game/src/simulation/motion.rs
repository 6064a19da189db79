use glam::Vec2;

use crate::snapshot::Entity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 400.0,
        }
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(Vec2::ZERO, Vec2::new(self.width, self.height))
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

/// Constant-speed kinematics shared by the host simulation, spawn replay
/// and participant dead reckoning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub arena: Arena,
    pub speed: f32,
    pub dt: f32,
}

impl Motion {
    pub fn new(arena: Arena, speed: f32, dt: f32) -> Self {
        Self { arena, speed, dt }
    }

    /// Moves one tick along `direction`, reflecting off the arena walls.
    pub fn step(&self, position: &mut Vec2, direction: &mut Vec2) {
        *position += *direction * self.speed * self.dt;
        bounce(&mut position.x, &mut direction.x, self.arena.width);
        bounce(&mut position.y, &mut direction.y, self.arena.height);
    }

    pub fn advance(&self, entity: &mut Entity) {
        self.step(&mut entity.position, &mut entity.direction);
    }

    pub fn replay(&self, entity: &mut Entity, ticks: u64) {
        for _ in 0..ticks {
            self.advance(entity);
        }
    }
}

fn bounce(coord: &mut f32, dir: &mut f32, extent: f32) {
    if *coord <= 0.0 {
        *coord = 0.0;
        *dir = dir.abs();
    } else if *coord >= extent {
        *coord = extent;
        *dir = -dir.abs();
    }
}
