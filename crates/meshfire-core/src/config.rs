//! Room configuration and game tuning
//!
//! Both structs are plain serde data with sensible defaults. They can be
//! written by hand in RON:
//!
//! ```
//! use meshfire_core::config::RoomConfig;
//!
//! let config = RoomConfig::from_ron_str("(map_seed: 7, npc_cap: 2)").unwrap();
//! assert_eq!(config.map_seed, 7);
//! assert_eq!(config.npc_cap(), 2);
//! ```

use crate::error::{Error, Result};
use crate::layout::{AMMO_MAX, DAMAGE_MAX, HP_MAX, RELOAD_MAX, SP_MAX, VEL_MAX, WEAPON_MAX};
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest interaction radius the spatial grid supports (half a cell)
pub const MAX_RADIUS: i32 = 1024;

/// NPC behavior presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// NPCs may spawn on ticks where `tick & mask == 0`
    pub fn spawn_mask(self) -> Tick {
        match self {
            Difficulty::Easy => 255,
            Difficulty::Normal => 127,
            Difficulty::Hard => 63,
        }
    }

    /// Random aim error in angle steps
    pub fn aim_spread(self) -> i32 {
        match self {
            Difficulty::Easy => 12,
            Difficulty::Normal => 6,
            Difficulty::Hard => 2,
        }
    }

    /// Chance in percent to pull the trigger on a tick with a target
    pub fn fire_chance(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Normal => 20,
            Difficulty::Hard => 35,
        }
    }
}

/// Settings shared by every peer of a room
///
/// All peers must agree on these values; they are carried in replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Initial gameplay RNG seed
    pub seed: u32,
    /// Seed for tiles and trees
    pub map_seed: u32,
    pub difficulty: Difficulty,
    /// Crates placed when the room is created
    pub barrel_count: u32,
    npc_cap: u8,
    tick_rate: u32,
    input_delay: Tick,
    prediction_ticks: Tick,
    /// Exchange per-tick fingerprints and abort on divergence
    pub debug_checks: bool,
}

impl RoomConfig {
    pub const MAX_NPCS: u8 = 32;
    pub const MAX_INPUT_DELAY: Tick = 30;
    pub const MAX_PREDICTION: Tick = 16;

    /// Parse a config from RON text
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let mut config: RoomConfig = ron::from_str(text)?;
        config.normalize();
        Ok(config)
    }

    /// Load a config from a RON file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Re-apply the setter ranges, e.g. after deserializing the config as
    /// part of a larger document
    pub fn normalize(&mut self) {
        self.set_npc_cap(self.npc_cap);
        self.set_tick_rate(self.tick_rate);
        self.set_input_delay(self.input_delay);
        self.set_prediction_ticks(self.prediction_ticks);
    }

    /// Maximum number of simultaneous NPC players
    pub fn npc_cap(&self) -> u8 {
        self.npc_cap
    }

    /// Clamped to `[0, MAX_NPCS]`
    pub fn set_npc_cap(&mut self, n: u8) {
        self.npc_cap = n.min(Self::MAX_NPCS);
    }

    /// Simulation ticks per second
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Clamped to `[10, 120]`
    pub fn set_tick_rate(&mut self, rate: u32) {
        self.tick_rate = rate.clamp(10, 120);
    }

    /// Milliseconds per tick
    pub fn tick_ms(&self) -> f64 {
        1000.0 / self.tick_rate as f64
    }

    /// Ticks between issuing an input and the tick it applies to
    pub fn input_delay(&self) -> Tick {
        self.input_delay
    }

    /// Clamped to `[1, MAX_INPUT_DELAY]`
    pub fn set_input_delay(&mut self, ticks: Tick) {
        self.input_delay = ticks.clamp(1, Self::MAX_INPUT_DELAY);
    }

    /// Extra speculative ticks rendered past the horizon
    pub fn prediction_ticks(&self) -> Tick {
        self.prediction_ticks
    }

    /// Clamped to `[0, MAX_PREDICTION]`
    pub fn set_prediction_ticks(&mut self, ticks: Tick) {
        self.prediction_ticks = ticks.min(Self::MAX_PREDICTION);
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            map_seed: 1,
            difficulty: Difficulty::Normal,
            barrel_count: 12,
            npc_cap: 4,
            tick_rate: 60,
            input_delay: 8,
            prediction_ticks: 8,
            debug_checks: cfg!(debug_assertions),
        }
    }
}

/// One entry of the weapons table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub name: String,
    /// Damage per bullet
    pub damage: u8,
    /// Rounds per clip; 0 means unlimited and never reloads
    pub clip: u8,
    pub reload_ticks: u8,
    /// Ticks between shots
    pub cooldown: u8,
    /// Bullet speed per tick
    pub speed: i32,
    /// Angle jitter per bullet
    pub spread: i32,
    /// Bullets per shot
    pub count: u8,
    /// Hits a bullet survives
    pub bullet_hp: u8,
    pub bullet_lifetime: u8,
    /// Recoil added per shot
    pub detune: u8,
    /// Shooter knock-back
    pub kickback: i32,
    /// Resolved instantly along a ray instead of travelling
    pub ray: bool,
    /// Ray length
    pub range: i32,
    /// Fires while held instead of on press
    pub auto: bool,
}

impl WeaponDef {
    fn projectile(name: &str, damage: u8, clip: u8, reload_ticks: u8, cooldown: u8, speed: i32) -> Self {
        Self {
            name: name.to_string(),
            damage,
            clip,
            reload_ticks,
            cooldown,
            speed,
            spread: 0,
            count: 1,
            bullet_hp: 1,
            bullet_lifetime: 60,
            detune: 0,
            kickback: 0,
            ray: false,
            range: 0,
            auto: false,
        }
    }
}

/// Items spawned when something dies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    pub min_items: u8,
    pub max_items: u8,
    /// Chance in percent that a carried weapon is dropped
    pub weapon_chance: u32,
    /// Carried weapons always dropped regardless of chance
    pub min_weapons: u8,
}

/// Gameplay constants
///
/// These feed straight into the deterministic step, so every peer must use
/// identical tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    /// Indexed by weapon id; entry 0 is the bare-hands melee attack
    pub weapons: Vec<WeaponDef>,
    pub player_radius: i32,
    pub tree_radius: i32,
    pub barrel_radius: i32,
    pub item_radius: i32,
    pub bullet_radius: i32,
    pub player_hp: u8,
    pub barrel_hp: u8,
    pub grave_hp: u8,
    pub walk_speed: i32,
    pub run_speed: i32,
    pub jump_speed: i32,
    pub gravity: i32,
    /// Ticks before an item decays
    pub item_lifetime: u8,
    /// Hit-flash length
    pub hit_flash: u8,
    pub health_pack: u8,
    pub shield_pack: u8,
    pub spawn_mags: u8,
    /// Score awarded for a kill by a human; NPC owners get half
    pub kill_score: u32,
    pub player_drops: DropTable,
    pub barrel_drops: DropTable,
}

impl GameTuning {
    /// Parse tuning from RON text and validate it
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let tuning: GameTuning = ron::from_str(text)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Look up a weapon, falling back to melee for unknown ids
    ///
    /// The table is never empty once [`GameTuning::validate`] has passed.
    pub fn weapon(&self, id: u8) -> &WeaponDef {
        self.weapons
            .get(id as usize)
            .unwrap_or(&self.weapons[0])
    }

    /// Check that every value fits the replicated field widths
    pub fn validate(&self) -> Result<()> {
        if self.weapons.is_empty() || self.weapons.len() > WEAPON_MAX as usize + 1 {
            return Err(Error::InvalidConfig(format!(
                "weapons table must have 1..={} entries",
                WEAPON_MAX as usize + 1
            )));
        }
        for (id, w) in self.weapons.iter().enumerate() {
            if w.damage > DAMAGE_MAX
                || w.clip > AMMO_MAX
                || w.reload_ticks > RELOAD_MAX
                || w.speed.abs() > VEL_MAX
                || w.count == 0
                || w.bullet_hp == 0
                || w.bullet_hp > HP_MAX
            {
                return Err(Error::UnknownWeapon(id as u8));
            }
        }
        for (name, r) in [
            ("player_radius", self.player_radius),
            ("tree_radius", self.tree_radius),
            ("barrel_radius", self.barrel_radius),
            ("item_radius", self.item_radius),
            ("bullet_radius", self.bullet_radius),
        ] {
            if r <= 0 || r > MAX_RADIUS {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in 1..={MAX_RADIUS}"
                )));
            }
        }
        if self.player_hp == 0 || self.player_hp > HP_MAX || self.shield_pack > SP_MAX {
            return Err(Error::InvalidConfig("hit points out of range".to_string()));
        }
        if self.hit_flash > crate::layout::ANIM_HIT_MAX {
            return Err(Error::InvalidConfig("hit_flash out of range".to_string()));
        }
        Ok(())
    }
}

impl GameTuning {
    /// Built-in weapons table
    pub fn default_weapons() -> Vec<WeaponDef> {
        let melee = WeaponDef {
            bullet_lifetime: 3,
            ..WeaponDef::projectile("fists", 2, 0, 0, 16, 400)
        };
        let pistol = WeaponDef {
            spread: 2,
            detune: 3,
            kickback: 16,
            ..WeaponDef::projectile("pistol", 3, 12, 40, 10, 700)
        };
        let rifle = WeaponDef {
            spread: 3,
            detune: 2,
            kickback: 24,
            auto: true,
            ..WeaponDef::projectile("rifle", 2, 30, 50, 5, 800)
        };
        let shotgun = WeaponDef {
            spread: 10,
            count: 5,
            bullet_lifetime: 24,
            detune: 6,
            kickback: 120,
            ..WeaponDef::projectile("shotgun", 2, 6, 60, 30, 650)
        };
        let railgun = WeaponDef {
            bullet_lifetime: 10,
            detune: 8,
            kickback: 200,
            ray: true,
            range: 24_000,
            ..WeaponDef::projectile("railgun", 8, 4, 60, 40, 0)
        };
        let ricochet = WeaponDef {
            spread: 5,
            bullet_hp: 4,
            bullet_lifetime: 90,
            detune: 2,
            kickback: 8,
            auto: true,
            ..WeaponDef::projectile("ricochet", 1, 40, 50, 4, 750)
        };
        vec![melee, pistol, rifle, shotgun, railgun, ricochet]
    }
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            weapons: Self::default_weapons(),
            player_radius: 480,
            tree_radius: 520,
            barrel_radius: 480,
            item_radius: 320,
            bullet_radius: 96,
            player_hp: 10,
            barrel_hp: 4,
            grave_hp: 3,
            walk_speed: 96,
            run_speed: 160,
            jump_speed: 80,
            gravity: 8,
            item_lifetime: 240,
            hit_flash: 12,
            health_pack: 4,
            shield_pack: 4,
            spawn_mags: 2,
            kill_score: 10,
            player_drops: DropTable {
                min_items: 1,
                max_items: 3,
                weapon_chance: 50,
                min_weapons: 1,
            },
            barrel_drops: DropTable {
                min_items: 1,
                max_items: 2,
                weapon_chance: 15,
                min_weapons: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        GameTuning::default().validate().unwrap();
    }

    #[test]
    fn test_room_setters_clamp() {
        let mut config = RoomConfig::default();
        config.set_npc_cap(200);
        assert_eq!(config.npc_cap(), RoomConfig::MAX_NPCS);
        config.set_input_delay(0);
        assert_eq!(config.input_delay(), 1);
        config.set_tick_rate(1000);
        assert_eq!(config.tick_rate(), 120);
        config.set_prediction_ticks(99);
        assert_eq!(config.prediction_ticks(), RoomConfig::MAX_PREDICTION);
    }

    #[test]
    fn test_room_from_ron_clamps() {
        let config =
            RoomConfig::from_ron_str("(map_seed: 3, difficulty: Hard, input_delay: 500)").unwrap();
        assert_eq!(config.map_seed, 3);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.input_delay(), RoomConfig::MAX_INPUT_DELAY);
        assert_eq!(config.tick_rate(), 60);
    }

    #[test]
    fn test_room_bad_ron() {
        assert!(matches!(
            RoomConfig::from_ron_str("(map_seed: \"x\")"),
            Err(Error::Ron(_))
        ));
    }

    #[test]
    fn test_tuning_rejects_wide_radius() {
        let tuning = GameTuning {
            tree_radius: 4000,
            ..GameTuning::default()
        };
        assert!(matches!(tuning.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_tuning_ron_roundtrip() {
        let text = ron::ser::to_string(&GameTuning::default()).unwrap();
        let parsed = GameTuning::from_ron_str(&text).unwrap();
        assert_eq!(parsed, GameTuning::default());
    }

    #[test]
    fn test_unknown_weapon_falls_back() {
        let tuning = GameTuning::default();
        assert_eq!(tuning.weapon(15).name, "fists");
        assert!(tuning.weapon(4).ray);
    }
}
