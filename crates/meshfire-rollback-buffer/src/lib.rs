//! Meshfire Rollback Buffer - Bounded per-tick history
//!
//! A fixed-size ring buffer keyed by tick. Each tick maps to slot
//! `tick % capacity`; writing a newer tick into an occupied slot evicts the
//! older entry, so memory never grows past the capacity.
//!
//! The session keeps its own fingerprints (and, with debug checks on, full
//! state copies) here so they can be compared against the fingerprints
//! peers report for the same tick.
//!
//! # Example
//!
//! ```rust
//! use meshfire_rollback_buffer::TickBuffer;
//!
//! let mut history = TickBuffer::new(4);
//! for tick in 0..6u32 {
//!     history.insert(tick, tick * 10);
//! }
//!
//! // ticks 0 and 1 were evicted by 4 and 5
//! assert!(history.get(1).is_none());
//! assert_eq!(history.get(5), Some(&50));
//! assert_eq!(history.tick_range(), Some((2, 5)));
//! ```

use meshfire_core::Tick;

/// A ring buffer of values keyed by tick
#[derive(Debug, Clone)]
pub struct TickBuffer<T> {
    slots: Vec<Option<(Tick, T)>>,
}

impl<T> TickBuffer<T> {
    /// Create a buffer holding at most `capacity` ticks (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    fn index(&self, tick: Tick) -> usize {
        tick as usize % self.slots.len()
    }

    /// Store a value for a tick, evicting whatever shared its slot
    ///
    /// Returns the evicted entry, if any.
    pub fn insert(&mut self, tick: Tick, value: T) -> Option<(Tick, T)> {
        let index = self.index(tick);
        self.slots[index].replace((tick, value))
    }

    pub fn get(&self, tick: Tick) -> Option<&T> {
        self.slots[self.index(tick)]
            .as_ref()
            .filter(|(t, _)| *t == tick)
            .map(|(_, v)| v)
    }

    /// Oldest and newest stored ticks
    pub fn tick_range(&self) -> Option<(Tick, Tick)> {
        let ticks = self.slots.iter().flatten().map(|(t, _)| *t);
        let min = ticks.clone().min()?;
        let max = ticks.max()?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let buffer: TickBuffer<u8> = TickBuffer::new(64);
        assert!(buffer.tick_range().is_none());
        let mut tiny = TickBuffer::new(0);
        tiny.insert(7, 'x');
        assert_eq!(tiny.get(7), Some(&'x'));
    }

    #[test]
    fn test_insert_and_get() {
        let mut buffer = TickBuffer::new(64);
        buffer.insert(10, "a");
        buffer.insert(11, "b");
        assert_eq!(buffer.get(10), Some(&"a"));
        assert!(buffer.get(12).is_none());
        // same slot, different tick
        assert!(buffer.get(74).is_none());
    }

    #[test]
    fn test_wrap_evicts_oldest() {
        let mut buffer = TickBuffer::new(4);
        for t in 0..4 {
            assert!(buffer.insert(t, t).is_none());
        }
        assert_eq!(buffer.insert(4, 4), Some((0, 0)));
        assert!(buffer.get(0).is_none());
        assert_eq!(buffer.get(4), Some(&4));
        assert_eq!(buffer.tick_range(), Some((1, 4)));
    }

    #[test]
    fn test_tick_range_ignores_insert_order() {
        let mut buffer = TickBuffer::new(64);
        buffer.insert(30, ());
        buffer.insert(10, ());
        buffer.insert(20, ());
        assert_eq!(buffer.tick_range(), Some((10, 30)));
    }
}
