//! NPC behavior and population control
//!
//! NPCs have no owning peer. Every peer runs the same logic on the same
//! state and draws from the replicated gameplay RNG, so NPC inputs agree
//! everywhere without being sent.

use super::SimulationContext;
use crate::input::{Input, BTN_FIRE};
use crate::math::{angle_of, dist_sq};
use crate::Tick;

/// Targets farther than this are ignored
const SIGHT: i64 = 16_000;
/// NPCs walk toward targets farther than this
const CHASE: i64 = 6_000;
/// Chance per tick to pick a new wander direction
const WANDER_CHANCE: u32 = 4;

impl SimulationContext {
    /// Compute this tick's input for the NPC at player index `i`
    pub(super) fn npc_think(&mut self, i: usize) -> u32 {
        let me = &self.state.players[i];
        let Some(prev) = me.player().map(|p| Input(p.input)) else {
            return 0;
        };
        let (x, y) = (me.x, me.y);

        let target = self
            .state
            .players
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && other.is_alive())
            .map(|(_, other)| (dist_sq(x, y, other.x, other.y), other.x, other.y))
            .min_by_key(|(d, _, _)| *d);

        let wander = if self.rng.percent(WANDER_CHANCE) {
            self.rng.byte()
        } else {
            prev.move_angle()
        };
        let mut input = Input::NONE.with_aim(prev.aim_angle()).with_move(wander);

        if let Some((d, tx, ty)) = target.filter(|(d, _, _)| *d < SIGHT * SIGHT) {
            let bearing = angle_of(tx - x, ty - y);
            let aim = bearing as i32 + self.rng.spread(self.difficulty.aim_spread());
            input = input.with_aim(aim.rem_euclid(256) as u8);
            if d > CHASE * CHASE {
                input = input.with_move(bearing);
            }
            // release between shots so single-fire weapons see an edge
            if !prev.held(BTN_FIRE) && self.rng.percent(self.difficulty.fire_chance()) {
                input = input.with(BTN_FIRE);
            }
        }
        input.raw()
    }

    /// Phase 10: spawn one NPC on the difficulty's tick mask while below cap
    pub(super) fn spawn_npcs(&mut self, tick: Tick) {
        if self.npc_cap == 0 || tick & self.difficulty.spawn_mask() != 0 {
            return;
        }
        if self.state.npc_count() >= self.npc_cap as usize {
            return;
        }
        let kinds = self.tuning.weapons.len() as u32;
        let weapon = if kinds > 1 {
            1 + self.rng.below((kinds - 1).min(3)) as u8
        } else {
            0
        };
        self.spawn_player(0, 0, weapon);
    }
}
