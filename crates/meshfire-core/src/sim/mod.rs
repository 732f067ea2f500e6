//! The deterministic simulation step
//!
//! [`SimulationContext`] owns everything one tick needs: the replicated
//! [`StateData`], the static map, tuning, the gameplay RNG, the visual RNG
//! and scratch grids. [`SimulationContext::step`] advances exactly one tick
//! in a fixed phase order:
//!
//! 1. apply due inputs in ascending client order, spawning players on request
//! 2. update players (movement, weapon state machine, shots, instant rays)
//! 3. barrel physics
//! 4. item physics, decay and pickups
//! 5. weapon drops on the drop-button edge
//! 6. bullet flight, wall bounces and hits
//! 7. remove everything with zero hit points
//! 8. push overlapping bodies apart
//! 9. tree hit-flash
//! 10. NPC population control
//! 11. store the RNG state and tick, sort and quantize
//!
//! No phase reads a clock or any peer-local randomness.

mod bodies;
mod bullets;
mod combat;
mod items;
mod npc;
mod player;

use crate::actor::{barrel, Actor, ActorKind};
use crate::config::{Difficulty, GameTuning, RoomConfig};
use crate::effect::{HotUsable, SimEffect};
use crate::error::Result;
use crate::grid::SpatialGrid;
use crate::map::GameMap;
use crate::rng::GameRng;
use crate::state::{ClientEvent, StateData};
use crate::Tick;

/// Explicit simulation state passed through every phase
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// The authoritative replicated state
    pub state: StateData,
    pub map: GameMap,
    pub tuning: GameTuning,
    pub difficulty: Difficulty,
    pub npc_cap: u8,
    /// Peer-local stream for cosmetic variation only
    pub visual_rng: GameRng,
    /// Effects produced by the last step
    pub effects: Vec<SimEffect>,
    /// Items players stood on this tick without picking them up
    pub hot_usable: Vec<HotUsable>,
    rng: GameRng,
    player_grid: SpatialGrid,
    barrel_grid: SpatialGrid,
    tree_grid: SpatialGrid,
    /// Rising trigger edges per player index, valid from phase 2 to phase 5
    edges: Vec<u8>,
    scratch: Vec<usize>,
}

impl SimulationContext {
    /// Create a fresh room: generate the map and place the initial crates
    pub fn new(config: &RoomConfig, tuning: GameTuning) -> Result<Self> {
        let map = GameMap::generate(config.map_seed);
        let state = StateData::new(config.seed, config.map_seed);
        let mut ctx = Self::with_map(state, map, tuning, config)?;
        ctx.place_barrels(config.barrel_count);
        Ok(ctx)
    }

    /// Resume from an adopted state, regenerating the map from its seed
    pub fn from_state(state: StateData, config: &RoomConfig, tuning: GameTuning) -> Result<Self> {
        let map = GameMap::generate(state.map_seed);
        Self::with_map(state, map, tuning, config)
    }

    /// Build a context around an explicit map
    pub fn with_map(
        state: StateData,
        map: GameMap,
        tuning: GameTuning,
        config: &RoomConfig,
    ) -> Result<Self> {
        tuning.validate()?;
        let mut tree_grid = SpatialGrid::new();
        tree_grid.rebuild(&map.trees);
        Ok(Self {
            rng: GameRng::from_state(state.seed),
            visual_rng: GameRng::new(state.seed.rotate_left(16) ^ 0x5bd1_e995),
            state,
            map,
            tuning,
            difficulty: config.difficulty,
            npc_cap: config.npc_cap(),
            effects: Vec::new(),
            hot_usable: Vec::new(),
            player_grid: SpatialGrid::new(),
            barrel_grid: SpatialGrid::new(),
            tree_grid,
            edges: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Replace the authoritative state, e.g. after adopting a snapshot
    pub fn replace_state(&mut self, state: StateData) {
        if state.map_seed != self.map.seed {
            self.map = GameMap::generate(state.map_seed);
            self.tree_grid.rebuild(&self.map.trees);
        }
        self.rng = GameRng::from_state(state.seed);
        self.state = state;
    }

    fn place_barrels(&mut self, count: u32) {
        self.rng = GameRng::from_state(self.state.seed);
        for _ in 0..count {
            let (x, y) = self.map.random_floor_position(&mut self.rng);
            let id = self.state.alloc_id();
            let mut crate_ = Actor::new(id, ActorKind::Barrel, x, y);
            crate_.subtype = barrel::CRATE;
            crate_.hp = self.tuning.barrel_hp;
            crate_.anim0 = self.rng.byte();
            self.state.barrels.push(crate_);
        }
        self.state.seed = self.rng.state();
    }

    /// Advance the state by one tick
    ///
    /// Only events whose tick equals the tick being simulated are applied.
    pub fn step(&mut self, events: &[ClientEvent]) {
        let tick = self.state.tick + 1;
        self.rng = GameRng::from_state(self.state.seed);
        self.effects.clear();
        self.hot_usable.clear();

        self.apply_events(tick, events);
        self.update_players();
        self.update_barrels();
        self.update_items();
        self.resolve_drops();
        self.update_bullets();
        self.remove_dead();
        self.resolve_bodies();
        self.update_trees();
        self.spawn_npcs(tick);
        self.finish(tick);
    }

    fn remove_dead(&mut self) {
        self.state.players.retain(Actor::is_alive);
        self.state.barrels.retain(Actor::is_alive);
        self.state.bullets.retain(Actor::is_alive);
        self.state.items.retain(Actor::is_alive);
    }

    fn update_trees(&mut self) {
        for tree in &mut self.map.trees {
            tree.anim_hit = tree.anim_hit.saturating_sub(1);
        }
    }

    fn finish(&mut self, tick: Tick) {
        self.state.seed = self.rng.state();
        self.state.tick = tick;
        self.state.sort_actors();
        self.state.quantize();
    }
}
