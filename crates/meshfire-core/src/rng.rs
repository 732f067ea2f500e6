//! Deterministic random number generator
//!
//! Uses a 32-bit xorshift so the whole generator state fits in one replicated
//! word (`StateData::seed`). Only integer arithmetic is used, which keeps every
//! peer on the same sequence regardless of platform.

use serde::{Deserialize, Serialize};

/// A deterministic random number generator
///
/// Never use thread-local or OS randomness in game logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    state: u32,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // xorshift requires non-zero state
        let state = if seed == 0 { 0x9e37_79b9 } else { seed };
        Self { state }
    }

    /// Create an RNG from a saved state
    pub fn from_state(state: u32) -> Self {
        Self::new(state)
    }

    /// Get the current state
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Generate the next raw u32 value
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Random value in `[0, n)`; returns 0 when `n == 0`
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.next_u32() % n
    }

    /// Random i32 in range `[min, max]`
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64 + 1) as u32;
        min + self.below(span) as i32
    }

    /// Random signed offset in `[-spread, spread]`
    pub fn spread(&mut self, spread: i32) -> i32 {
        self.range_i32(-spread, spread)
    }

    /// Random byte, used for angles and per-actor animation seeds
    pub fn byte(&mut self) -> u8 {
        (self.next_u32() >> 24) as u8
    }

    /// True with the given probability in percent
    pub fn percent(&mut self, chance: u32) -> bool {
        self.below(100) < chance
    }
}
