use std::f32::consts::TAU;

use glam::Vec2;

use crate::simulation::{Arena, SimulationConfig};

/// The player pose. Ground truth on the host, a blended copy on participants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avatar {
    pub position: Vec2,
    pub angle: f32,
}

impl Avatar {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            angle: 0.0,
        }
    }

    pub fn centered(arena: &Arena) -> Self {
        Self::new(arena.center())
    }

    /// Unit vector the avatar is facing.
    pub fn heading(&self) -> Vec2 {
        Vec2::new(-self.angle.sin(), self.angle.cos())
    }

    /// Applies one tick of rotation and throttle input. `turn` and
    /// `throttle` are in `[-1, 1]`; only forward throttle moves the avatar.
    pub fn steer(&mut self, turn: f32, throttle: f32, dt: f32, config: &SimulationConfig) {
        self.angle = (self.angle + turn.clamp(-1.0, 1.0) * config.avatar_turn_rate * dt)
            .rem_euclid(TAU);

        let throttle = throttle.clamp(0.0, 1.0);
        if throttle > 0.0 {
            let step = self.heading() * config.avatar_speed * throttle * dt;
            self.position = config.arena.clamp(self.position + step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_wraps_into_full_turn() {
        let config = SimulationConfig::default();
        let mut avatar = Avatar::centered(&config.arena);

        avatar.steer(-1.0, 0.0, 0.1, &config);
        assert!(avatar.angle > 0.0 && avatar.angle < TAU);
        assert!((avatar.angle - (TAU - 0.3)).abs() < 1e-4);
    }

    #[test]
    fn test_throttle_moves_along_heading_and_stays_inside() {
        let config = SimulationConfig::default();
        let mut avatar = Avatar::centered(&config.arena);

        avatar.steer(0.0, 1.0, 0.5, &config);
        assert!((avatar.position.y - 300.0).abs() < 1e-3);
        assert!((avatar.position.x - 350.0).abs() < 1e-3);

        for _ in 0..20 {
            avatar.steer(0.0, 1.0, 0.5, &config);
        }
        assert_eq!(avatar.position.y, config.arena.height);
    }
}
