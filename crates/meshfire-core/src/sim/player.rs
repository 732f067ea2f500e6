//! Phases 1, 2 and 5: inputs, player update, weapon drops

use super::bodies::slide;
use super::SimulationContext;
use crate::actor::{item, Actor, ActorKind, BulletData, ClientId, PlayerData, WeaponSlot};
use crate::effect::SimEffect;
use crate::input::{
    rising, Input, BTN_JUMP, BTN_MOVE, BTN_RUN, BTN_SPAWN, TRIG_DROP, TRIG_FIRE, TRIG_RELOAD,
    TRIG_SWAP,
};
use crate::layout::DETUNE_MAX;
use crate::math::polar;
use crate::state::ClientEvent;
use crate::Tick;

/// Speed of a thrown weapon
const THROW_SPEED: i32 = 256;

/// A shot requested by the weapon state machine
#[derive(Debug, Clone, Copy)]
pub(super) struct Shot {
    weapon: u8,
    aim: u8,
    /// Recoil before this shot was added
    detune: u8,
}

impl SimulationContext {
    pub(super) fn apply_events(&mut self, tick: Tick, events: &[ClientEvent]) {
        let mut due: Vec<&ClientEvent> = events.iter().filter(|e| e.tick == tick).collect();
        // stable: same-client events keep their log order
        due.sort_by_key(|e| e.client);

        for event in due {
            let existing = self
                .state
                .players
                .iter_mut()
                .filter_map(Actor::player_mut)
                .find(|p| p.client == event.client);
            match existing {
                Some(p) => p.input = event.input,
                None if event.client > 0 && Input(event.input).held(BTN_SPAWN) => {
                    self.spawn_player(event.client, event.input, 1);
                }
                None => {}
            }
        }
    }

    /// Create a player at a random floor position
    ///
    /// A non-positive `client` creates an NPC whose client id is derived from
    /// its actor id.
    pub(super) fn spawn_player(&mut self, client: ClientId, input: u32, weapon: u8) -> u32 {
        let (x, y) = self.map.random_floor_position(&mut self.rng);
        let id = self.state.alloc_id();
        let client = if client > 0 { client } else { -(id as ClientId) };
        let clip = self.tuning.weapon(weapon).clip;

        let mut actor = Actor::new(
            id,
            ActorKind::Player(PlayerData {
                client,
                input,
                trig: Input(input).trigger_bits(),
                detune: 0,
                mags: self.tuning.spawn_mags,
                slots: [
                    WeaponSlot {
                        weapon,
                        ammo: clip,
                        reload: 0,
                    },
                    WeaponSlot::default(),
                ],
            }),
            x,
            y,
        );
        actor.hp = self.tuning.player_hp;
        actor.anim0 = self.rng.byte();
        self.state.players.push(actor);
        self.effects.push(SimEffect::Spawn { actor: id, client });
        id
    }

    pub(super) fn update_players(&mut self) {
        self.edges.clear();
        for i in 0..self.state.players.len() {
            if !self.state.players[i].is_alive() {
                self.edges.push(0);
                continue;
            }
            if self.state.players[i].player().is_some_and(PlayerData::is_npc) {
                let input = self.npc_think(i);
                if let Some(p) = self.state.players[i].player_mut() {
                    p.input = input;
                }
            }
            let (edges, shot) = self.move_and_arm(i);
            self.edges.push(edges);
            if let Some(shot) = shot {
                self.fire(i, shot);
            }
        }
    }

    /// Movement, jumping and the weapon state machine for one player
    fn move_and_arm(&mut self, i: usize) -> (u8, Option<Shot>) {
        let tuning = &self.tuning;
        let Actor {
            x,
            y,
            z,
            u,
            v,
            w,
            lifetime,
            anim_hit,
            kind: ActorKind::Player(p),
            ..
        } = &mut self.state.players[i]
        else {
            return (0, None);
        };
        *anim_hit = anim_hit.saturating_sub(1);

        let input = Input(p.input);
        let (tu, tv) = if input.held(BTN_MOVE) {
            let speed = if input.held(BTN_RUN) {
                tuning.run_speed
            } else {
                tuning.walk_speed
            };
            polar(input.move_angle(), speed)
        } else {
            (0, 0)
        };
        *u += (tu - *u) / 4;
        *v += (tv - *v) / 4;

        if input.held(BTN_JUMP) && *z == 0 && *w == 0 {
            *w = tuning.jump_speed;
        }
        if *z > 0 || *w != 0 {
            *z += *w;
            *w -= tuning.gravity;
            if *z <= 0 {
                *z = 0;
                *w = 0;
            }
        }
        slide(&self.map, x, y, u, v, false);

        *lifetime = lifetime.saturating_sub(1);
        let held = input.trigger_bits();
        let edges = rising(held, p.trig);

        {
            let slot = &mut p.slots[0];
            if slot.reload > 0 {
                slot.reload -= 1;
                if slot.reload == 0 {
                    slot.ammo = tuning.weapon(slot.weapon).clip;
                }
            }
        }
        if edges & TRIG_SWAP != 0 {
            p.slots.swap(0, 1);
        }
        if edges & TRIG_RELOAD != 0 {
            let def = tuning.weapon(p.slots[0].weapon);
            start_reload(p, def.clip, def.reload_ticks);
        }

        let def = tuning.weapon(p.slots[0].weapon);
        let trigger = if def.auto { held } else { edges };
        let mut shot = None;
        if trigger & TRIG_FIRE != 0 && *lifetime == 0 && p.slots[0].reload == 0 {
            let slot = &mut p.slots[0];
            if def.clip == 0 || slot.ammo > 0 {
                if def.clip > 0 {
                    slot.ammo -= 1;
                }
                *lifetime = def.cooldown;
                shot = Some(Shot {
                    weapon: slot.weapon,
                    aim: input.aim_angle(),
                    detune: p.detune,
                });
                p.detune = p.detune.saturating_add(def.detune).min(DETUNE_MAX);
                let (kx, ky) = polar(input.aim_angle(), def.kickback);
                *u -= kx;
                *v -= ky;
            }
        } else {
            p.detune = p.detune.saturating_sub(1);
        }
        if p.slots[0].ammo == 0 {
            start_reload(p, def.clip, def.reload_ticks);
        }
        (edges, shot)
    }

    /// Turn a shot into bullets, or resolve it instantly for ray weapons
    fn fire(&mut self, i: usize, shot: Shot) {
        let shooter = &self.state.players[i];
        let (x, y, z, shooter_id) = (shooter.x, shooter.y, shooter.z, shooter.id);
        let Some(owner) = shooter.owner_id() else {
            return;
        };
        let def = self.tuning.weapon(shot.weapon);
        let (count, spread, speed, damage, bullet_hp, bullet_lifetime, ray) = (
            def.count,
            def.spread + shot.detune as i32 / 2,
            def.speed,
            def.damage,
            def.bullet_hp,
            def.bullet_lifetime,
            def.ray,
        );
        let muzzle = self.tuning.player_radius;

        self.effects.push(SimEffect::Shot {
            shooter: shooter_id,
            weapon: shot.weapon,
            variation: self.visual_rng.byte(),
        });

        for _ in 0..count {
            let angle = (shot.aim as i32 + self.rng.spread(spread)).rem_euclid(256) as u8;
            let (mx, my) = polar(angle, muzzle);
            if ray {
                self.fire_ray(x + mx, y + my, angle, shot.weapon, owner);
                continue;
            }
            let (bu, bv) = polar(angle, speed);
            let id = self.state.alloc_id();
            let mut bullet = Actor::new(
                id,
                ActorKind::Bullet(BulletData { owner, damage }),
                x + mx,
                y + my,
            );
            bullet.subtype = shot.weapon;
            bullet.z = z;
            bullet.u = bu;
            bullet.v = bv;
            bullet.hp = bullet_hp;
            bullet.lifetime = bullet_lifetime;
            bullet.anim0 = self.rng.byte();
            self.state.bullets.push(bullet);
        }
    }

    /// Phase 5: detach the held weapon on an unconsumed drop edge, then
    /// latch the trigger bits for the next tick
    pub(super) fn resolve_drops(&mut self) {
        for i in 0..self.state.players.len() {
            let edges = self.edges.get(i).copied().unwrap_or(0);
            let actor = &mut self.state.players[i];
            let alive = actor.is_alive();
            let (x, y) = (actor.x, actor.y);
            let Some(p) = actor.player_mut() else {
                continue;
            };
            let mut dropped = None;
            if alive && edges & TRIG_DROP != 0 && !p.slots[0].is_empty() {
                dropped = Some((std::mem::take(&mut p.slots[0]), Input(p.input).aim_angle()));
            }
            p.trig = Input(p.input).trigger_bits();

            if let Some((slot, aim)) = dropped {
                let id = self.spawn_item(x, y, item::WEAPON, slot.weapon, slot.ammo);
                let (tu, tv) = polar(aim, THROW_SPEED);
                if let Some(thrown) = self.state.items.iter_mut().rev().find(|a| a.id == id) {
                    thrown.u = tu;
                    thrown.v = tv;
                }
            }
        }
    }
}

fn start_reload(p: &mut PlayerData, clip: u8, reload_ticks: u8) {
    let slot = &mut p.slots[0];
    if slot.reload == 0 && clip > 0 && slot.ammo < clip && p.mags > 0 {
        p.mags -= 1;
        slot.reload = reload_ticks.max(1);
    }
}

#[cfg(test)]
mod tests {
    use crate::input::{Input, BTN_DROP, BTN_FIRE, BTN_RELOAD, BTN_SWAP};
    use crate::sim::tests::{add_player, open_context};
    use crate::state::ClientEvent;

    #[test]
    fn test_reload_uses_magazine() {
        let mut ctx = open_context();
        let p = add_player(&mut ctx, 1, 20_000, 20_000);
        {
            let data = ctx.state.players[p].player_mut().unwrap();
            data.mags = 2;
            data.slots[0].ammo = 3;
        }
        let reload = Input::NONE.with(BTN_RELOAD).raw();
        ctx.step(&[ClientEvent::new(1, 1, reload)]);
        let data = ctx.state.players[0].player().unwrap();
        assert_eq!(data.mags, 1);
        assert!(data.slots[0].reload > 0);

        let reload_ticks = ctx.tuning.weapon(1).reload_ticks as u32;
        for _ in 0..reload_ticks {
            ctx.step(&[]);
        }
        let data = ctx.state.players[0].player().unwrap();
        assert_eq!(data.slots[0].reload, 0);
        assert_eq!(data.slots[0].ammo, ctx.tuning.weapon(1).clip);
    }

    #[test]
    fn test_swap_edge() {
        let mut ctx = open_context();
        let p = add_player(&mut ctx, 1, 20_000, 20_000);
        ctx.state.players[p].player_mut().unwrap().slots[1].weapon = 3;
        let swap = Input::NONE.with(BTN_SWAP).raw();
        ctx.step(&[ClientEvent::new(1, 1, swap)]);
        ctx.step(&[]);
        let data = ctx.state.players[0].player().unwrap();
        assert_eq!(data.slots[0].weapon, 3);
        assert_eq!(data.slots[1].weapon, 1);
    }

    #[test]
    fn test_drop_spawns_weapon_item() {
        let mut ctx = open_context();
        add_player(&mut ctx, 1, 20_000, 20_000);
        let drop = Input::NONE.with(BTN_DROP).raw();
        ctx.step(&[ClientEvent::new(1, 1, drop)]);
        let data = ctx.state.players[0].player().unwrap();
        assert!(data.slots[0].is_empty());
        assert_eq!(ctx.state.items.len(), 1);
        assert_eq!(ctx.state.items[0].item().unwrap().weapon, 1);
        assert_eq!(ctx.state.items[0].item().unwrap().ammo, 12);
    }

    #[test]
    fn test_shot_spawns_bullet() {
        let mut ctx = open_context();
        add_player(&mut ctx, 1, 20_000, 20_000);
        let fire = Input::NONE.with_aim(64).with(BTN_FIRE).raw();
        ctx.step(&[ClientEvent::new(1, 1, fire)]);
        assert_eq!(ctx.state.bullets.len(), 1);
        let bullet = &ctx.state.bullets[0];
        assert_eq!(bullet.bullet().unwrap().owner, 1);
        assert!(bullet.y > 20_000);
    }
}
