//! Actor records
//!
//! Every simulated object shares one base record ([`Actor`]) and carries its
//! kind-specific data in [`ActorKind`]. Simulation code dispatches on the tag;
//! there are no trait objects in the hot loops.

use crate::layout::{
    AMMO_MAX, ANIM_HIT_MAX, DAMAGE_MAX, DETUNE_MAX, HP_MAX, MAGS_MAX, POS_MAX, RELOAD_MAX,
    SP_MAX, SUBTYPE_MAX, TRIG_MASK, VEL_MAX, VEL_MIN, WEAPON_MAX,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client identifier. Positive for humans; NPC players use non-positive ids.
pub type ClientId = i32;

/// Actor type tag, as stored in the 3-bit header field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActorType {
    Player = 0,
    Barrel = 1,
    Bullet = 2,
    Item = 3,
    Tree = 4,
}

impl ActorType {
    /// Decode a header tag
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ActorType::Player),
            1 => Some(ActorType::Barrel),
            2 => Some(ActorType::Bullet),
            3 => Some(ActorType::Item),
            4 => Some(ActorType::Tree),
            _ => None,
        }
    }

    /// The header tag
    pub fn tag(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorType::Player => "player",
            ActorType::Barrel => "barrel",
            ActorType::Bullet => "bullet",
            ActorType::Item => "item",
            ActorType::Tree => "tree",
        };
        f.write_str(name)
    }
}

/// Barrel subtypes
pub mod barrel {
    pub const CRATE: u8 = 0;
    /// Spawned where a player died
    pub const GRAVE: u8 = 1;
}

/// Item subtypes
pub mod item {
    pub const HEALTH: u8 = 0;
    pub const SHIELD: u8 = 1;
    pub const MAGAZINE: u8 = 2;
    pub const GEM: u8 = 3;
    /// Dropped weapon; `ItemData::weapon` is set
    pub const WEAPON: u8 = 4;
}

/// One weapon slot of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeaponSlot {
    /// Weapon id (0 = bare hands)
    pub weapon: u8,
    /// Rounds left in the clip
    pub ammo: u8,
    /// Countdown until the clip is refilled
    pub reload: u8,
}

impl WeaponSlot {
    pub fn is_empty(&self) -> bool {
        self.weapon == 0
    }

    fn quantize(&mut self) {
        self.weapon = self.weapon.min(WEAPON_MAX);
        self.ammo = self.ammo.min(AMMO_MAX);
        self.reload = self.reload.min(RELOAD_MAX);
    }
}

/// Player-only data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerData {
    /// Owning client; non-positive for NPCs
    pub client: ClientId,
    /// Full button and aim bitfield
    pub input: u32,
    /// Latched trigger bits from the previous tick, for edge detection
    pub trig: u8,
    /// Recoil accumulator widening the spread
    pub detune: u8,
    /// Reserve magazines
    pub mags: u8,
    /// Current weapon first, then the holstered one
    pub slots: [WeaponSlot; 2],
}

impl PlayerData {
    /// True when the player is driven by the shared NPC logic
    pub fn is_npc(&self) -> bool {
        self.client <= 0
    }
}

/// Bullet-only data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulletData {
    /// Owner-derived id of the shooter (sign tells player from NPC)
    pub owner: ClientId,
    /// Damage applied on hit
    pub damage: u8,
}

/// Item-only data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemData {
    /// Embedded weapon for dropped weapons (0 = none)
    pub weapon: u8,
    /// Rounds in the embedded weapon's clip
    pub ammo: u8,
}

/// Kind-specific payload, also the actor's type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Player(PlayerData),
    Barrel,
    Bullet(BulletData),
    Item(ItemData),
    Tree,
}

impl ActorKind {
    pub fn actor_type(&self) -> ActorType {
        match self {
            ActorKind::Player(_) => ActorType::Player,
            ActorKind::Barrel => ActorType::Barrel,
            ActorKind::Bullet(_) => ActorType::Bullet,
            ActorKind::Item(_) => ActorType::Item,
            ActorKind::Tree => ActorType::Tree,
        }
    }
}

/// A simulated object
///
/// Positions and velocities are kept as `i32` so that physics can overshoot
/// during a tick; [`Actor::quantize`] brings every field back into its
/// declared range at the end of the tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique ascending id, never reused in a session
    pub id: u32,
    /// Meaning depends on the kind (item kind, tree graphic, source weapon)
    pub subtype: u8,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub u: i32,
    pub v: i32,
    pub w: i32,
    pub hp: u8,
    pub sp: u8,
    /// Countdown; bullets and items expire, players use it as fire cooldown
    pub lifetime: u8,
    /// Static per-actor animation seed
    pub anim0: u8,
    /// Hit-flash countdown
    pub anim_hit: u8,
    /// Transient per-tick resolution mark, never serialized
    #[serde(skip)]
    pub resolved: bool,
    pub kind: ActorKind,
}

impl Actor {
    /// Create an actor of the given kind at rest at `(x, y)`
    pub fn new(id: u32, kind: ActorKind, x: i32, y: i32) -> Self {
        Self {
            id,
            subtype: 0,
            x,
            y,
            z: 0,
            u: 0,
            v: 0,
            w: 0,
            hp: 1,
            sp: 0,
            lifetime: 0,
            anim0: 0,
            anim_hit: 0,
            resolved: false,
            kind,
        }
    }

    pub fn actor_type(&self) -> ActorType {
        self.kind.actor_type()
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn player(&self) -> Option<&PlayerData> {
        match &self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            ActorKind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn bullet(&self) -> Option<&BulletData> {
        match &self.kind {
            ActorKind::Bullet(b) => Some(b),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&ItemData> {
        match &self.kind {
            ActorKind::Item(i) => Some(i),
            _ => None,
        }
    }

    /// Owner-derived id used for friendly-fire exclusion
    ///
    /// Human players answer with their client id, NPC players with the
    /// negated actor id. Other kinds are never excluded.
    pub fn owner_id(&self) -> Option<ClientId> {
        self.player().map(|p| p.client)
    }

    /// Weapon shown in the header: the held weapon of a player or the
    /// embedded weapon of an item
    pub fn header_weapon(&self) -> u8 {
        match &self.kind {
            ActorKind::Player(p) => p.slots[0].weapon,
            ActorKind::Item(i) => i.weapon,
            _ => 0,
        }
    }

    /// Clamp and truncate every field to its declared bit width
    ///
    /// Idempotent: applying it twice gives the same result as once.
    pub fn quantize(&mut self) {
        self.subtype = self.subtype.min(SUBTYPE_MAX);
        self.x = self.x.clamp(0, POS_MAX);
        self.y = self.y.clamp(0, POS_MAX);
        self.z = self.z.clamp(0, POS_MAX);
        self.u = self.u.clamp(VEL_MIN, VEL_MAX);
        self.v = self.v.clamp(VEL_MIN, VEL_MAX);
        self.w = self.w.clamp(VEL_MIN, VEL_MAX);
        self.hp = self.hp.min(HP_MAX);
        self.sp = self.sp.min(SP_MAX);
        self.anim_hit = self.anim_hit.min(ANIM_HIT_MAX);
        self.resolved = false;
        match &mut self.kind {
            ActorKind::Player(p) => {
                p.trig &= TRIG_MASK;
                p.detune = p.detune.min(DETUNE_MAX);
                p.mags = p.mags.min(MAGS_MAX);
                for slot in &mut p.slots {
                    slot.quantize();
                }
            }
            ActorKind::Bullet(b) => {
                b.damage = b.damage.min(DAMAGE_MAX);
            }
            ActorKind::Item(i) => {
                i.weapon = i.weapon.min(WEAPON_MAX);
                i.ammo = i.ammo.min(AMMO_MAX);
            }
            ActorKind::Barrel | ActorKind::Tree => {}
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.actor_type(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wild_player() -> Actor {
        let mut a = Actor::new(
            7,
            ActorKind::Player(PlayerData {
                client: 3,
                input: 0,
                trig: 0xff,
                detune: 200,
                mags: 99,
                slots: [
                    WeaponSlot { weapon: 30, ammo: 200, reload: 90 },
                    WeaponSlot::default(),
                ],
            }),
            -50,
            70_000,
        );
        a.u = 5000;
        a.v = -5000;
        a.hp = 40;
        a.sp = 17;
        a.anim_hit = 99;
        a.subtype = 33;
        a.resolved = true;
        a
    }

    #[test]
    fn test_quantize_clamps() {
        let mut a = wild_player();
        a.quantize();
        assert_eq!((a.x, a.y), (0, POS_MAX));
        assert_eq!((a.u, a.v), (VEL_MAX, VEL_MIN));
        assert_eq!(a.hp, HP_MAX);
        assert_eq!(a.sp, SP_MAX);
        assert_eq!(a.anim_hit, ANIM_HIT_MAX);
        assert_eq!(a.subtype, SUBTYPE_MAX);
        assert!(!a.resolved);
        let p = a.player().unwrap();
        assert_eq!(p.trig, TRIG_MASK);
        assert_eq!(p.detune, DETUNE_MAX);
        assert_eq!(p.mags, MAGS_MAX);
        assert_eq!(p.slots[0].weapon, WEAPON_MAX);
        assert_eq!(p.slots[0].ammo, AMMO_MAX);
        assert_eq!(p.slots[0].reload, RELOAD_MAX);
    }

    #[test]
    fn test_quantize_idempotent() {
        let mut once = wild_player();
        once.quantize();
        let mut twice = once.clone();
        twice.quantize();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_owner_id() {
        let a = wild_player();
        assert_eq!(a.owner_id(), Some(3));
        let tree = Actor::new(1, ActorKind::Tree, 0, 0);
        assert_eq!(tree.owner_id(), None);
        assert_eq!(format!("{}", tree), "tree#1");
    }

    #[test]
    fn test_type_tags() {
        for t in [
            ActorType::Player,
            ActorType::Barrel,
            ActorType::Bullet,
            ActorType::Item,
            ActorType::Tree,
        ] {
            assert_eq!(ActorType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(ActorType::from_tag(7), None);
    }
}
