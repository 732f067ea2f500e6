//! Phase 4: item physics, decay and pickups

use super::bodies::integrate;
use super::SimulationContext;
use crate::actor::{item, Actor, ActorKind, WeaponSlot};
use crate::effect::{HotUsable, SimEffect};
use crate::input::TRIG_DROP;
use crate::layout::{MAGS_MAX, SP_MAX};

/// Fresh items cannot be picked up for this many ticks
const PICKUP_DELAY: u8 = 30;

/// What happened when a player touched an item
enum Pickup {
    Taken,
    /// Taken, and the player's previous weapon has to be dropped
    Swapped(WeaponSlot),
    /// Weapon item the player could take by pressing drop
    Hot,
    Refused,
}

impl SimulationContext {
    pub(super) fn update_items(&mut self) {
        for it in &mut self.state.items {
            integrate(&self.map, it, self.tuning.gravity);
            it.lifetime = it.lifetime.saturating_sub(1);
            if it.lifetime == 0 {
                it.hp = 0;
            }
        }

        self.player_grid.rebuild(&self.state.players);
        let reach = self.tuning.item_radius + self.tuning.player_radius;
        let ready_below = self.tuning.item_lifetime.saturating_sub(PICKUP_DELAY);
        let mut found = std::mem::take(&mut self.scratch);

        for ii in 0..self.state.items.len() {
            let it = &self.state.items[ii];
            if !it.is_alive() || it.lifetime > ready_below {
                continue;
            }
            self.player_grid
                .query(&self.state.players, it.x, it.y, reach, false, &mut found);
            for &pi in &found {
                if self.try_pickup(pi, ii) {
                    break;
                }
            }
        }
        self.scratch = found;
    }

    /// Let player `pi` touch item `ii`; returns true when the item is gone
    fn try_pickup(&mut self, pi: usize, ii: usize) -> bool {
        let it = &self.state.items[ii];
        let (subtype, item_id) = (it.subtype, it.id);
        let Some(data) = it.item().copied() else {
            return false;
        };
        let player_hp = self.tuning.player_hp;
        let (health_pack, shield_pack) = (self.tuning.health_pack, self.tuning.shield_pack);

        let Actor {
            id: player_id,
            x,
            y,
            hp,
            sp,
            kind: ActorKind::Player(p),
            ..
        } = &mut self.state.players[pi]
        else {
            return false;
        };
        let (player_id, x, y, client) = (*player_id, *x, *y, p.client);

        let outcome = match subtype {
            item::HEALTH if *hp < player_hp => {
                *hp = hp.saturating_add(health_pack).min(player_hp);
                Pickup::Taken
            }
            item::SHIELD if *sp < SP_MAX => {
                *sp = sp.saturating_add(shield_pack).min(SP_MAX);
                Pickup::Taken
            }
            item::MAGAZINE if p.mags < MAGS_MAX => {
                p.mags += 1;
                Pickup::Taken
            }
            item::GEM => Pickup::Taken,
            item::WEAPON if data.weapon != 0 => {
                let incoming = WeaponSlot {
                    weapon: data.weapon,
                    ammo: data.ammo,
                    reload: 0,
                };
                if p.slots[0].is_empty() {
                    p.slots[0] = incoming;
                    Pickup::Taken
                } else if p.slots[1].is_empty() {
                    p.slots[1] = incoming;
                    Pickup::Taken
                } else if self.edges.get(pi).is_some_and(|e| e & TRIG_DROP != 0) {
                    let old = std::mem::replace(&mut p.slots[0], incoming);
                    Pickup::Swapped(old)
                } else {
                    Pickup::Hot
                }
            }
            _ => Pickup::Refused,
        };

        match outcome {
            Pickup::Refused => false,
            Pickup::Hot => {
                if !self.hot_usable.iter().any(|h| h.player == player_id) {
                    self.hot_usable.push(HotUsable {
                        player: player_id,
                        item: item_id,
                    });
                }
                false
            }
            Pickup::Taken | Pickup::Swapped(_) => {
                if subtype == item::GEM {
                    self.state.stat_mut(client).scores += 1;
                }
                if let Pickup::Swapped(old) = outcome {
                    // the drop edge is spent on the swap
                    if let Some(e) = self.edges.get_mut(pi) {
                        *e &= !TRIG_DROP;
                    }
                    self.spawn_item(x, y, item::WEAPON, old.weapon, old.ammo);
                }
                self.state.items[ii].hp = 0;
                self.effects.push(SimEffect::Pickup {
                    player: player_id,
                    item: subtype,
                });
                true
            }
        }
    }
}
