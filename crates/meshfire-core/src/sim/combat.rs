//! Damage, death consequences and instant rays

use super::SimulationContext;
use crate::actor::{
    barrel, item, Actor, ActorKind, ActorType, BulletData, ClientId, ItemData, WeaponSlot,
};
use crate::config::DropTable;
use crate::effect::{HitSound, SimEffect};
use crate::math::{dist_sq, polar};
use tracing::trace;

/// Distance between ray samples
const RAY_STEP: i32 = 128;
/// Random scatter speed of dropped items
const DROP_SCATTER: i32 = 64;
/// Ray trace speed shown to renderers
const TRACE_SPEED: i32 = 1023;

/// Something that can be hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Target {
    Player(usize),
    Barrel(usize),
    Tree(usize),
}

impl SimulationContext {
    /// Position and radius of a target
    pub(super) fn target_body(&self, target: Target) -> (i32, i32, i32) {
        match target {
            Target::Player(i) => {
                let a = &self.state.players[i];
                (a.x, a.y, self.tuning.player_radius)
            }
            Target::Barrel(i) => {
                let a = &self.state.barrels[i];
                (a.x, a.y, self.tuning.barrel_radius)
            }
            Target::Tree(i) => {
                let a = &self.map.trees[i];
                (a.x, a.y, self.tuning.tree_radius)
            }
        }
    }

    /// Apply one hit
    ///
    /// Order: velocity impulse, hit-flash reset, shield, hit points. Trees
    /// only flash. A hit that brings hit points to zero runs the death
    /// consequences credited to `owner`.
    pub(super) fn hit(&mut self, target: Target, damage: u8, impulse: (i32, i32), owner: ClientId) {
        let flash = self.tuning.hit_flash;
        let actor = match target {
            Target::Player(i) => &mut self.state.players[i],
            Target::Barrel(i) => &mut self.state.barrels[i],
            Target::Tree(i) => {
                self.map.trees[i].anim_hit = flash;
                return;
            }
        };
        if !actor.is_alive() {
            return;
        }
        actor.u += impulse.0;
        actor.v += impulse.1;
        actor.anim_hit = flash;

        let absorbed = actor.sp.min(damage);
        actor.sp -= absorbed;
        let taken = (damage - absorbed).min(actor.hp);
        actor.hp -= taken;

        let sound = if absorbed > 0 {
            HitSound::Absorbed
        } else {
            HitSound::Damage
        };
        let (id, dead) = (actor.id, actor.hp == 0);
        self.effects.push(SimEffect::Hit {
            target: id,
            sound,
            absorbed,
            damage: taken,
            variation: self.visual_rng.byte(),
        });
        if dead {
            self.kill(target, owner);
        }
    }

    fn kill(&mut self, target: Target, owner: ClientId) {
        match target {
            Target::Player(i) => {
                let victim = &self.state.players[i];
                let (x, y, id) = (victim.x, victim.y, victim.id);
                let slots = victim.player().map(|p| p.slots).unwrap_or_default();
                trace!(victim = id, owner, "player killed");

                self.drop_loot(x, y, self.tuning.player_drops, &slots);

                let grave_id = self.state.alloc_id();
                let mut grave = Actor::new(grave_id, ActorKind::Barrel, x, y);
                grave.subtype = barrel::GRAVE;
                grave.hp = self.tuning.grave_hp;
                grave.anim0 = self.rng.byte();
                self.state.barrels.push(grave);

                let score = if owner > 0 {
                    self.tuning.kill_score
                } else {
                    self.tuning.kill_score / 2
                };
                let stat = self.state.stat_mut(owner);
                stat.frags += 1;
                stat.scores += score;

                self.effects.push(SimEffect::Death {
                    actor: id,
                    actor_type: ActorType::Player,
                });
            }
            Target::Barrel(i) => {
                let victim = &self.state.barrels[i];
                let (x, y, id, actor_type) = (victim.x, victim.y, victim.id, victim.actor_type());
                self.drop_loot(x, y, self.tuning.barrel_drops, &[]);
                self.effects.push(SimEffect::Death { actor: id, actor_type });
            }
            Target::Tree(_) => {}
        }
    }

    /// Scatter loot around `(x, y)`
    ///
    /// Carried weapons drop with the table's chance, the first `min_weapons`
    /// always. Without carried weapons the chance rolls for a random one.
    fn drop_loot(&mut self, x: i32, y: i32, table: DropTable, carried: &[WeaponSlot]) {
        let mut dropped = 0u8;
        let mut any_carried = false;
        for slot in carried.iter().filter(|s| !s.is_empty()) {
            any_carried = true;
            if dropped < table.min_weapons || self.rng.percent(table.weapon_chance) {
                self.spawn_item(x, y, item::WEAPON, slot.weapon, slot.ammo);
                dropped += 1;
            }
        }
        if !any_carried && self.rng.percent(table.weapon_chance) {
            let kinds = self.tuning.weapons.len() as u32;
            if kinds > 1 {
                let weapon = 1 + self.rng.below(kinds - 1) as u8;
                let clip = self.tuning.weapon(weapon).clip;
                self.spawn_item(x, y, item::WEAPON, weapon, clip);
            }
        }

        let count = self
            .rng
            .range_i32(table.min_items as i32, table.max_items as i32);
        for _ in 0..count {
            let kind = match self.rng.below(4) {
                0 => item::HEALTH,
                1 => item::SHIELD,
                2 => item::MAGAZINE,
                _ => item::GEM,
            };
            self.spawn_item(x, y, kind, 0, 0);
        }
    }

    /// Create an item with a small random scatter velocity
    pub(super) fn spawn_item(&mut self, x: i32, y: i32, subtype: u8, weapon: u8, ammo: u8) -> u32 {
        let id = self.state.alloc_id();
        let mut a = Actor::new(id, ActorKind::Item(ItemData { weapon, ammo }), x, y);
        a.subtype = subtype;
        a.lifetime = self.tuning.item_lifetime;
        a.u = self.rng.spread(DROP_SCATTER);
        a.v = self.rng.spread(DROP_SCATTER);
        a.anim0 = self.rng.byte();
        self.state.items.push(a);
        id
    }

    /// Resolve an instant ray from `(x, y)`
    ///
    /// The ray is sampled every [`RAY_STEP`] units against the tile map and
    /// every player, barrel and tree. The first body it touches takes the
    /// hit. A short-lived trace bullet is left at the end point for
    /// renderers; it never deals damage.
    pub(super) fn fire_ray(&mut self, x: i32, y: i32, angle: u8, weapon: u8, owner: ClientId) {
        let def = self.tuning.weapon(weapon);
        let (damage, range, lifetime, kickback) =
            (def.damage, def.range, def.bullet_lifetime, def.kickback);
        let br = self.tuning.bullet_radius;

        let (mut px, mut py) = (x, y);
        let mut travelled = 0;
        let mut struck = None;
        while travelled < range {
            let (dx, dy) = polar(angle, travelled);
            px = x + dx;
            py = y + dy;
            if self.map.is_solid(px, py) {
                break;
            }
            struck = self.ray_target(px, py, br, owner);
            if struck.is_some() {
                break;
            }
            travelled += RAY_STEP;
        }
        if let Some(target) = struck {
            self.hit(target, damage, polar(angle, kickback / 4), owner);
        }

        let id = self.state.alloc_id();
        let mut trace = Actor::new(id, ActorKind::Bullet(BulletData { owner, damage: 0 }), px, py);
        trace.subtype = weapon;
        let (tu, tv) = polar(angle, TRACE_SPEED);
        trace.u = tu;
        trace.v = tv;
        trace.lifetime = lifetime;
        self.state.bullets.push(trace);
    }

    fn ray_target(&self, x: i32, y: i32, br: i32, owner: ClientId) -> Option<Target> {
        let within = |a: &Actor, r: i32| {
            let reach = (r + br) as i64;
            a.is_alive() && dist_sq(a.x, a.y, x, y) <= reach * reach
        };
        if let Some(i) = self
            .state
            .players
            .iter()
            .position(|a| a.owner_id() != Some(owner) && within(a, self.tuning.player_radius))
        {
            return Some(Target::Player(i));
        }
        if let Some(i) = self
            .state
            .barrels
            .iter()
            .position(|a| within(a, self.tuning.barrel_radius))
        {
            return Some(Target::Barrel(i));
        }
        self.map
            .trees
            .iter()
            .position(|a| within(a, self.tuning.tree_radius))
            .map(Target::Tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::SimEffect;
    use crate::input::{Input, BTN_FIRE};
    use crate::sim::tests::{add_player, open_context};
    use crate::state::ClientEvent;

    #[test]
    fn test_kill_drops_grave_and_credits_owner() {
        let mut ctx = open_context();
        let p = add_player(&mut ctx, 3, 20_000, 20_000);
        ctx.state.players[p].hp = 2;
        ctx.hit(Target::Player(p), 5, (0, 0), 7);

        assert_eq!(ctx.state.players[p].hp, 0);
        assert_eq!(ctx.state.barrels.len(), 1);
        assert_eq!(ctx.state.barrels[0].subtype, barrel::GRAVE);
        let stat = ctx.state.stats[&7];
        assert_eq!(stat.frags, 1);
        assert_eq!(stat.scores, ctx.tuning.kill_score);
        // min_weapons guarantees the pistol drops
        assert!(ctx
            .state
            .items
            .iter()
            .any(|i| i.subtype == item::WEAPON && i.item().unwrap().weapon == 1));
        assert!(ctx.effects.iter().any(|e| matches!(e, SimEffect::Death { .. })));
    }

    #[test]
    fn test_npc_kill_gets_half_credit() {
        let mut ctx = open_context();
        let p = add_player(&mut ctx, 3, 20_000, 20_000);
        ctx.state.players[p].hp = 1;
        ctx.hit(Target::Player(p), 1, (0, 0), -12);
        let stat = ctx.state.stats[&-12];
        assert_eq!(stat.scores, ctx.tuning.kill_score / 2);
    }

    #[test]
    fn test_dead_target_is_not_hit_twice() {
        let mut ctx = open_context();
        let p = add_player(&mut ctx, 3, 20_000, 20_000);
        ctx.state.players[p].hp = 1;
        ctx.hit(Target::Player(p), 1, (0, 0), 7);
        ctx.hit(Target::Player(p), 1, (0, 0), 7);
        assert_eq!(ctx.state.stats[&7].frags, 1);
        assert_eq!(ctx.state.barrels.len(), 1);
    }

    #[test]
    fn test_railgun_hits_instantly() {
        let mut ctx = open_context();
        let shooter = add_player(&mut ctx, 1, 20_000, 20_000);
        {
            let slot = &mut ctx.state.players[shooter].player_mut().unwrap().slots[0];
            slot.weapon = 4;
            slot.ammo = 4;
        }
        add_player(&mut ctx, 2, 26_000, 20_000);
        let fire = Input::NONE.with_aim(0).with(BTN_FIRE).raw();
        ctx.step(&[ClientEvent::new(1, 1, fire)]);

        let damage = ctx.tuning.weapon(4).damage;
        let target = ctx.state.player_of(2).unwrap();
        assert_eq!(target.hp, 10 - damage);
        // trace bullet is left behind but never moves or hits
        assert_eq!(ctx.state.bullets.len(), 1);
        assert_eq!(ctx.state.bullets[0].bullet().unwrap().damage, 0);
    }
}
