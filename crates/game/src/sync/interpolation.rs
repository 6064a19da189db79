use glam::Vec2;

use crate::net::GameStatePayload;
use crate::simulation::SimulationConfig;
use crate::snapshot::{Avatar, EntityRegistry};

/// How far a value moves toward its target in one application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blend {
    /// `current + (target - current) * weight`.
    Lerp(f32),
    /// Direct assignment.
    Snap,
}

impl Blend {
    pub fn scalar(self, current: f32, target: f32) -> f32 {
        match self {
            Blend::Lerp(weight) => current + (target - current) * weight,
            Blend::Snap => target,
        }
    }

    pub fn vec2(self, current: Vec2, target: Vec2) -> Vec2 {
        match self {
            Blend::Lerp(weight) => current + (target - current) * weight,
            Blend::Snap => target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Move a fixed fraction toward the target snapshot every tick.
    #[default]
    Blend,
    /// Apply snapshots immediately and fully.
    Snap,
}

/// Moves the local avatar and entities toward a buffered snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    mode: InterpolationMode,
    frames_per_packet: u32,
}

impl Interpolator {
    pub fn new(mode: InterpolationMode, frames_per_packet: u32) -> Self {
        Self {
            mode,
            frames_per_packet: frames_per_packet.max(1),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let mode = if config.interpolation {
            InterpolationMode::Blend
        } else {
            InterpolationMode::Snap
        };
        Self::new(mode, config.frames_per_packet())
    }

    pub fn mode(&self) -> InterpolationMode {
        self.mode
    }

    pub fn frames_per_packet(&self) -> u32 {
        self.frames_per_packet
    }

    /// Per-tick blend weight, `1 / frames_per_packet`.
    pub fn weight(&self) -> f32 {
        1.0 / self.frames_per_packet as f32
    }

    pub fn blend(&self) -> Blend {
        match self.mode {
            InterpolationMode::Blend => Blend::Lerp(self.weight()),
            InterpolationMode::Snap => Blend::Snap,
        }
    }

    /// One tick of reconciliation toward `target`.
    pub fn apply(&self, target: &GameStatePayload, avatar: &mut Avatar, registry: &mut EntityRegistry) {
        let blend = self.blend();

        avatar.position = blend.vec2(avatar.position, target.avatar_position);
        // Plain lerp, not the shortest arc: crossing 0/2pi swings the long way round.
        avatar.angle = blend.scalar(avatar.angle, target.avatar_angle);

        registry.apply_snapshot(&target.entities, blend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::EntityPayload;
    use crate::snapshot::AuthorityState;

    fn target() -> GameStatePayload {
        let mut state = GameStatePayload::new(10, Vec2::new(120.0, 60.0), 1.5);
        state.entities.push(EntityPayload::new(2, Vec2::new(300.0, 100.0)));
        state
    }

    #[test]
    fn test_residual_decays_geometrically() {
        let interpolator = Interpolator::new(InterpolationMode::Blend, 6);
        let mut avatar = Avatar::new(Vec2::ZERO);
        let mut registry = EntityRegistry::new(4);
        registry.confirm(2, Vec2::ZERO, Vec2::ZERO).unwrap();

        let target = target();
        let start = target.avatar_position.length();

        for tick in 1..=6 {
            interpolator.apply(&target, &mut avatar, &mut registry);
            let residual = (target.avatar_position - avatar.position).length();
            let expected = start * (1.0 - 1.0 / 6.0f32).powi(tick);
            assert!((residual - expected).abs() < 1e-3, "tick {tick}");
        }

        for _ in 0..120 {
            interpolator.apply(&target, &mut avatar, &mut registry);
        }
        assert!((avatar.position - target.avatar_position).length() < 1e-3);
        assert!((avatar.angle - target.avatar_angle).abs() < 1e-4);
        let entity = registry.find(2).unwrap();
        assert!((entity.position - Vec2::new(300.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn test_first_sighting_is_adopted_outright() {
        let interpolator = Interpolator::new(InterpolationMode::Blend, 6);
        let mut avatar = Avatar::new(Vec2::ZERO);
        let mut registry = EntityRegistry::new(4);

        interpolator.apply(&target(), &mut avatar, &mut registry);

        let entity = registry.find(2).unwrap();
        assert_eq!(entity.state, AuthorityState::Confirmed);
        assert_eq!(entity.position, Vec2::new(300.0, 100.0));
        assert_eq!(avatar.position, Vec2::new(20.0, 10.0));
    }

    #[test]
    fn test_snap_mode_applies_fully() {
        let interpolator = Interpolator::new(InterpolationMode::Snap, 6);
        let mut avatar = Avatar::new(Vec2::ZERO);
        let mut registry = EntityRegistry::new(4);
        registry.confirm(2, Vec2::ZERO, Vec2::ZERO).unwrap();

        interpolator.apply(&target(), &mut avatar, &mut registry);

        assert_eq!(avatar.position, Vec2::new(120.0, 60.0));
        assert_eq!(avatar.angle, 1.5);
        assert_eq!(registry.find(2).unwrap().position, Vec2::new(300.0, 100.0));
    }

    #[test]
    fn test_angle_takes_the_long_way_across_zero() {
        let interpolator = Interpolator::new(InterpolationMode::Blend, 2);
        let mut avatar = Avatar::new(Vec2::ZERO);
        avatar.angle = 0.1;
        let mut registry = EntityRegistry::new(1);

        let mut target = GameStatePayload::new(0, Vec2::ZERO, 6.2);
        target.entities.clear();
        interpolator.apply(&target, &mut avatar, &mut registry);

        assert!((avatar.angle - 3.15).abs() < 1e-4);
    }

    #[test]
    fn test_weight_follows_config() {
        let interpolator = Interpolator::from_config(&SimulationConfig::default());
        assert_eq!(interpolator.frames_per_packet(), 6);
        assert!((interpolator.weight() - 1.0 / 6.0).abs() < 1e-6);

        let snap = Interpolator::from_config(&SimulationConfig {
            interpolation: false,
            ..Default::default()
        });
        assert_eq!(snap.blend(), Blend::Snap);
    }
}
