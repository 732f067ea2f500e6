//! Bit widths and word positions of every replicated field
//!
//! This is the single definition shared by the end-of-tick quantization pass
//! and by the wire codec. A field's width bounds its in-memory value; its
//! shift places it inside one 32-bit wire word.
//!
//! ```text
//! header  | type:3 | subtype:4 | weapon:4 | lifetime:8 | anim0:8 | hp:4 |
//! axis    | vel:11 (biased) | pos:16 |                       (x, y, z)
//! status  | sp:4 | animHit:5 | detune:5 | trig:4 | mags:4 | damage:4 |
//! slots   | ammo:6 | reload:6 | weapon2:4 | ammo2:6 | reload2:6 |
//! ```

/// A bit field inside a 32-bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Position of the lowest bit
    pub shift: u32,
    /// Width in bits
    pub bits: u32,
}

impl Field {
    /// Create a field descriptor
    pub const fn new(shift: u32, bits: u32) -> Self {
        Self { shift, bits }
    }

    /// Largest value the field can hold
    pub const fn max(self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1 << self.bits) - 1
        }
    }

    /// Mask of the field inside its word
    pub const fn mask(self) -> u32 {
        self.max() << self.shift
    }

    /// First bit after the field
    pub const fn end(self) -> u32 {
        self.shift + self.bits
    }

    /// Check that a value is representable
    pub const fn fits(self, value: u32) -> bool {
        value <= self.max()
    }

    /// Extract the field from a word
    pub const fn get(self, word: u32) -> u32 {
        (word >> self.shift) & self.max()
    }

    /// Store a value into a word, truncating it to the field width
    pub const fn put(self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value & self.max()) << self.shift)
    }
}

// Header word
pub const HDR_TYPE: Field = Field::new(0, 3);
pub const HDR_SUBTYPE: Field = Field::new(3, 4);
pub const HDR_WEAPON: Field = Field::new(7, 4);
pub const HDR_LIFETIME: Field = Field::new(11, 8);
pub const HDR_ANIM0: Field = Field::new(19, 8);
pub const HDR_HP: Field = Field::new(27, 4);

// Axis words (one per x/y/z)
pub const AXIS_VEL: Field = Field::new(0, 11);
pub const AXIS_POS: Field = Field::new(11, 16);

// Status word
pub const ST_SP: Field = Field::new(0, 4);
pub const ST_ANIM_HIT: Field = Field::new(4, 5);
pub const ST_DETUNE: Field = Field::new(9, 5);
pub const ST_TRIG: Field = Field::new(14, 4);
pub const ST_MAGS: Field = Field::new(18, 4);
pub const ST_DAMAGE: Field = Field::new(22, 4);

// Weapon slot word (players; items use the first ammo field)
pub const SLOT_AMMO: Field = Field::new(0, 6);
pub const SLOT_RELOAD: Field = Field::new(6, 6);
pub const SLOT_WEAPON2: Field = Field::new(12, 4);
pub const SLOT_AMMO2: Field = Field::new(16, 6);
pub const SLOT_RELOAD2: Field = Field::new(22, 6);

/// Velocities are stored biased so the 11-bit field is unsigned on the wire
pub const VEL_BIAS: i32 = 1 << (AXIS_VEL.bits - 1);
pub const VEL_MIN: i32 = -VEL_BIAS;
pub const VEL_MAX: i32 = AXIS_VEL.max() as i32 - VEL_BIAS;
pub const POS_MAX: i32 = AXIS_POS.max() as i32;

pub const HP_MAX: u8 = HDR_HP.max() as u8;
pub const SP_MAX: u8 = ST_SP.max() as u8;
pub const ANIM_HIT_MAX: u8 = ST_ANIM_HIT.max() as u8;
pub const DETUNE_MAX: u8 = ST_DETUNE.max() as u8;
pub const MAGS_MAX: u8 = ST_MAGS.max() as u8;
pub const AMMO_MAX: u8 = SLOT_AMMO.max() as u8;
pub const RELOAD_MAX: u8 = SLOT_RELOAD.max() as u8;
pub const WEAPON_MAX: u8 = HDR_WEAPON.max() as u8;
pub const SUBTYPE_MAX: u8 = HDR_SUBTYPE.max() as u8;
pub const DAMAGE_MAX: u8 = ST_DAMAGE.max() as u8;
pub const TRIG_MASK: u8 = ST_TRIG.max() as u8;

const _: () = assert!(HDR_HP.end() <= 32);
const _: () = assert!(AXIS_POS.end() <= 32);
const _: () = assert!(ST_DAMAGE.end() <= 32);
const _: () = assert!(SLOT_RELOAD2.end() <= 32);
const _: () = assert!(SLOT_AMMO.bits == SLOT_AMMO2.bits && SLOT_RELOAD.bits == SLOT_RELOAD2.bits);
