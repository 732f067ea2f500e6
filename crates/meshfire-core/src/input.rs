//! Player input bitfield
//!
//! One 32-bit word carries the full command of a player for a tick:
//!
//! ```text
//! | move angle:8 | aim angle:8 | move | run | jump | fire | drop | reload | swap | spawn |
//! ```

use crate::layout::Field;
use serde::{Deserialize, Serialize};

pub const MOVE_ANGLE: Field = Field::new(0, 8);
pub const AIM_ANGLE: Field = Field::new(8, 8);

pub const BTN_MOVE: u32 = 1 << 16;
pub const BTN_RUN: u32 = 1 << 17;
pub const BTN_JUMP: u32 = 1 << 18;
pub const BTN_FIRE: u32 = 1 << 19;
pub const BTN_DROP: u32 = 1 << 20;
pub const BTN_RELOAD: u32 = 1 << 21;
pub const BTN_SWAP: u32 = 1 << 22;
pub const BTN_SPAWN: u32 = 1 << 23;

/// Bits of the 4-bit trigger latch, one per edge-detected button
pub const TRIG_FIRE: u8 = 1 << 0;
pub const TRIG_DROP: u8 = 1 << 1;
pub const TRIG_RELOAD: u8 = 1 << 2;
pub const TRIG_SWAP: u8 = 1 << 3;

/// Typed view over a raw input word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Input(pub u32);

impl Input {
    /// Empty input (no buttons held)
    pub const NONE: Input = Input(0);

    /// Get the raw word
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Set the movement direction and hold the move button
    pub fn with_move(self, angle: u8) -> Self {
        Input(MOVE_ANGLE.put(self.0, angle as u32) | BTN_MOVE)
    }

    /// Set the aim direction
    pub fn with_aim(self, angle: u8) -> Self {
        Input(AIM_ANGLE.put(self.0, angle as u32))
    }

    /// Hold the given button bits
    pub fn with(self, buttons: u32) -> Self {
        Input(self.0 | buttons)
    }

    /// Release the given button bits
    pub fn without(self, buttons: u32) -> Self {
        Input(self.0 & !buttons)
    }

    pub fn move_angle(self) -> u8 {
        MOVE_ANGLE.get(self.0) as u8
    }

    pub fn aim_angle(self) -> u8 {
        AIM_ANGLE.get(self.0) as u8
    }

    /// Check whether all of the given buttons are held
    pub fn held(self, buttons: u32) -> bool {
        self.0 & buttons == buttons
    }

    /// Buttons that take part in edge detection, packed as trigger bits
    pub fn trigger_bits(self) -> u8 {
        let mut bits = 0;
        if self.held(BTN_FIRE) {
            bits |= TRIG_FIRE;
        }
        if self.held(BTN_DROP) {
            bits |= TRIG_DROP;
        }
        if self.held(BTN_RELOAD) {
            bits |= TRIG_RELOAD;
        }
        if self.held(BTN_SWAP) {
            bits |= TRIG_SWAP;
        }
        bits
    }
}

impl From<u32> for Input {
    fn from(raw: u32) -> Self {
        Input(raw)
    }
}

/// Rising edges given the held bits and the latch from the previous tick
pub fn rising(held: u8, latch: u8) -> u8 {
    held & !latch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angles_and_buttons() {
        let input = Input::NONE.with_move(200).with_aim(17).with(BTN_FIRE | BTN_JUMP);
        assert_eq!(input.move_angle(), 200);
        assert_eq!(input.aim_angle(), 17);
        assert!(input.held(BTN_MOVE));
        assert!(input.held(BTN_FIRE | BTN_JUMP));
        assert!(!input.held(BTN_DROP));

        let released = input.without(BTN_FIRE);
        assert!(!released.held(BTN_FIRE));
        assert_eq!(released.aim_angle(), 17);
    }

    #[test]
    fn test_trigger_edges() {
        let held = Input::NONE.with(BTN_FIRE | BTN_SWAP).trigger_bits();
        assert_eq!(held, TRIG_FIRE | TRIG_SWAP);
        assert_eq!(rising(held, TRIG_FIRE), TRIG_SWAP);
        assert_eq!(rising(held, held), 0);
    }
}
