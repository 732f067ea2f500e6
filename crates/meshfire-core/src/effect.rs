//! Cosmetic side effects of a tick
//!
//! The step never plays sounds or spawns particles itself. It records what
//! happened as [`SimEffect`] values; audio and particle systems read them
//! after the tick. The `variation` bytes come from the visual-only RNG
//! stream and never influence gameplay.

use crate::actor::{ActorType, ClientId};
use serde::{Deserialize, Serialize};

/// Which hit sound to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitSound {
    /// The shield took at least part of the damage
    Absorbed,
    /// All damage went to hit points
    Damage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEffect {
    Spawn {
        actor: u32,
        client: ClientId,
    },
    Shot {
        shooter: u32,
        weapon: u8,
        variation: u8,
    },
    Hit {
        target: u32,
        sound: HitSound,
        /// Damage taken by the shield
        absorbed: u8,
        /// Damage taken by hit points
        damage: u8,
        variation: u8,
    },
    Death {
        actor: u32,
        actor_type: ActorType,
    },
    Pickup {
        player: u32,
        item: u8,
    },
}

/// An item a player is standing on but cannot pick up without a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotUsable {
    pub player: u32,
    pub item: u32,
}
