use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::net::GameStatePayload;
use crate::simulation::MAX_BUFFERED_STATES;

/// Arrival-ordered queue of received snapshots. When full, the oldest one
/// is evicted to make room, so the simulation never falls far behind.
#[derive(Debug)]
pub struct StateBuffer {
    states: VecDeque<GameStatePayload>,
    capacity: usize,
    evicted: u64,
}

impl Default for StateBuffer {
    fn default() -> Self {
        Self::new(MAX_BUFFERED_STATES)
    }
}

impl StateBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            states: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Enqueues `state`, returning the snapshot it displaced, if any.
    pub fn push(&mut self, state: GameStatePayload) -> Option<GameStatePayload> {
        let evicted = if self.states.len() >= self.capacity {
            self.evicted += 1;
            self.states.pop_front()
        } else {
            None
        };
        self.states.push_back(state);
        evicted
    }

    /// Current interpolation target.
    pub fn front(&self) -> Option<&GameStatePayload> {
        self.states.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameStatePayload> {
        self.states.iter()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// `StateBuffer` shared between the network thread (producer) and the
/// simulation loop (consumer). The lock is held only for the queue
/// operation itself.
#[derive(Debug, Clone, Default)]
pub struct SharedStateBuffer {
    inner: Arc<Mutex<StateBuffer>>,
}

impl SharedStateBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StateBuffer::new(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, state: GameStatePayload) {
        if let Some(stale) = self.lock().push(state) {
            log::trace!(
                "Simulation behind, dropped snapshot for frame {}",
                stale.command_frame
            );
        }
    }

    /// Copy of the current interpolation target.
    pub fn front(&self) -> Option<GameStatePayload> {
        self.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.lock().evicted()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    fn state(frame: u64) -> GameStatePayload {
        GameStatePayload::new(frame, Vec2::ZERO, 0.0)
    }

    #[test]
    fn test_keeps_the_two_most_recent_in_arrival_order() {
        let mut buffer = StateBuffer::default();
        for frame in 1..=5 {
            buffer.push(state(frame));
        }

        let frames: Vec<u64> = buffer.iter().map(|s| s.command_frame).collect();
        assert_eq!(frames, vec![4, 5]);
        assert_eq!(buffer.evicted(), 3);
    }

    #[test]
    fn test_front_is_not_consumed_by_reading() {
        let mut buffer = StateBuffer::default();
        assert!(buffer.front().is_none());

        buffer.push(state(7));
        assert_eq!(buffer.front().map(|s| s.command_frame), Some(7));
        assert_eq!(buffer.front().map(|s| s.command_frame), Some(7));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_push_reports_evicted_snapshot() {
        let mut buffer = StateBuffer::new(2);
        assert!(buffer.push(state(1)).is_none());
        assert!(buffer.push(state(2)).is_none());
        assert_eq!(buffer.push(state(3)).map(|s| s.command_frame), Some(1));
        assert_eq!(buffer.front().map(|s| s.command_frame), Some(2));
    }

    #[test]
    fn test_shared_buffer_across_threads() {
        let shared = SharedStateBuffer::new(2);
        let producer = shared.clone();

        std::thread::spawn(move || {
            for frame in 0..10 {
                producer.push(state(frame));
            }
        })
        .join()
        .unwrap();

        assert_eq!(shared.len(), 2);
        assert_eq!(shared.front().map(|s| s.command_frame), Some(8));
        assert_eq!(shared.evicted(), 8);
    }
}
