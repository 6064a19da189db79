/// Converts variable frame time into a whole number of fixed ticks.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    /// Longest frame time absorbed in one go; anything beyond is dropped.
    const MAX_FRAME_TIME: f32 = 0.25;

    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.min(Self::MAX_FRAME_TIME);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }
}

/// Monotonic command-frame counter, advanced once per fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandClock {
    frame: u64,
}

impl CommandClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn advance(&mut self) -> u64 {
        self.frame = self.frame.wrapping_add(1);
        self.frame
    }

    /// Adopts the host's frame. May move the clock backwards.
    pub fn resync(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// Ticks elapsed since `frame`; zero for frames from the future.
    pub fn elapsed_since(&self, frame: u64) -> u64 {
        self.frame.saturating_sub(frame)
    }
}
