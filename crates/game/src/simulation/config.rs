use std::time::Duration;

use crate::net::{DEFAULT_TICK_RATE, ENTITY_COUNT};

use super::motion::{Arena, Motion};

pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_BUFFERED_STATES: usize = 2;

/// Settings both roles must agree on.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub tick_rate: u32,
    pub send_interval: Duration,
    pub arena: Arena,
    pub entity_speed: f32,
    pub avatar_speed: f32,
    pub avatar_turn_rate: f32,
    pub entity_count: u16,
    pub max_replay_frames: u64,
    pub interpolation: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            send_interval: DEFAULT_SEND_INTERVAL,
            arena: Arena::default(),
            entity_speed: 200.0,
            avatar_speed: 200.0,
            avatar_turn_rate: 3.0,
            entity_count: ENTITY_COUNT,
            max_replay_frames: 600,
            interpolation: true,
        }
    }
}

impl SimulationConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Ticks between two snapshots: `ceil(send_interval / tick_delta)`.
    pub fn frames_per_packet(&self) -> u32 {
        let micros = self.send_interval.as_micros() * self.tick_rate.max(1) as u128;
        micros.div_ceil(1_000_000).clamp(1, u32::MAX as u128) as u32
    }

    pub fn motion(&self) -> Motion {
        Motion::new(self.arena, self.entity_speed, self.dt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_per_packet_is_exact_for_whole_ratios() {
        let config = SimulationConfig::default();
        assert_eq!(config.frames_per_packet(), 6);
    }

    #[test]
    fn test_frames_per_packet_rounds_up() {
        let config = SimulationConfig {
            tick_rate: 60,
            send_interval: Duration::from_millis(110),
            ..Default::default()
        };
        assert_eq!(config.frames_per_packet(), 7);

        let fast = SimulationConfig {
            tick_rate: 30,
            send_interval: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(fast.frames_per_packet(), 1);
    }
}
