//! Replicated session state

use crate::actor::{Actor, ActorKind, ClientId};
use crate::hash::{WordHasher, DEFAULT_HASH_SEED};
use crate::Tick;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One input command scheduled for a specific tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientEvent {
    /// Tick the command applies to
    pub tick: Tick,
    /// Issuing client
    pub client: ClientId,
    /// Raw input bitfield
    pub input: u32,
}

impl ClientEvent {
    pub fn new(tick: Tick, client: ClientId, input: u32) -> Self {
        Self { tick, client, input }
    }
}

/// Per-client score line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStat {
    pub frags: u32,
    pub scores: u32,
}

/// The complete replicated state of a room
///
/// Trees are static and derived from `map_seed`, so they live in the map,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateData {
    /// Last simulated tick
    pub tick: Tick,
    /// Gameplay RNG state after the last tick
    pub seed: u32,
    pub map_seed: u32,
    /// Next actor id to hand out
    pub next_id: u32,
    pub players: Vec<Actor>,
    pub barrels: Vec<Actor>,
    pub bullets: Vec<Actor>,
    pub items: Vec<Actor>,
    /// Frags and scores keyed by owner-derived client id
    pub stats: IndexMap<ClientId, PlayerStat>,
}

impl StateData {
    /// Create an empty state
    pub fn new(seed: u32, map_seed: u32) -> Self {
        Self {
            tick: 0,
            seed,
            map_seed,
            next_id: 1,
            players: Vec::new(),
            barrels: Vec::new(),
            bullets: Vec::new(),
            items: Vec::new(),
            stats: IndexMap::new(),
        }
    }

    /// Hand out the next actor id
    pub fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// The four live actor lists in canonical order
    pub fn lists(&self) -> [&Vec<Actor>; 4] {
        [&self.players, &self.barrels, &self.bullets, &self.items]
    }

    /// Total number of live actors
    pub fn actor_count(&self) -> usize {
        self.lists().iter().map(|l| l.len()).sum()
    }

    /// Find the live player owned by a client
    pub fn player_of(&self, client: ClientId) -> Option<&Actor> {
        self.players
            .iter()
            .find(|a| a.player().is_some_and(|p| p.client == client))
    }

    /// Number of NPC players
    pub fn npc_count(&self) -> usize {
        self.players
            .iter()
            .filter(|a| a.player().is_some_and(|p| p.is_npc()))
            .count()
    }

    /// Stat line of a client, created on first use
    pub fn stat_mut(&mut self, client: ClientId) -> &mut PlayerStat {
        self.stats.entry(client).or_default()
    }

    /// Restore the canonical order (ascending id) of every list
    pub fn sort_actors(&mut self) {
        for list in [
            &mut self.players,
            &mut self.barrels,
            &mut self.bullets,
            &mut self.items,
        ] {
            list.sort_by_key(|a| a.id);
        }
    }

    /// Quantize every actor
    pub fn quantize(&mut self) {
        for list in [
            &mut self.players,
            &mut self.barrels,
            &mut self.bullets,
            &mut self.items,
        ] {
            for actor in list.iter_mut() {
                actor.quantize();
            }
        }
    }

    /// Deterministic 32-bit digest of the state
    ///
    /// Stats are hashed in ascending client order so insertion order does
    /// not leak into the digest.
    pub fn digest(&self) -> u32 {
        let mut h = WordHasher::new(DEFAULT_HASH_SEED);
        h.write(self.tick);
        h.write(self.seed);
        h.write(self.map_seed);
        h.write(self.next_id);
        for list in self.lists() {
            h.write(list.len() as u32);
            for a in list {
                hash_actor(&mut h, a);
            }
        }
        let mut stats: Vec<_> = self.stats.iter().collect();
        stats.sort_by_key(|(client, _)| **client);
        for (client, stat) in stats {
            h.write(*client as u32);
            h.write(stat.frags);
            h.write(stat.scores);
        }
        h.finish32()
    }

    /// Small per-tick summary for divergence checks
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            tick: self.tick,
            seed: self.seed,
            next_id: self.next_id,
            digest: self.digest(),
        }
    }
}

fn hash_actor(h: &mut WordHasher, a: &Actor) {
    h.write(a.id);
    h.write(a.actor_type().tag() | (a.subtype as u32) << 8);
    for v in [a.x, a.y, a.z, a.u, a.v, a.w] {
        h.write(v as u32);
    }
    h.write(u32::from_le_bytes([a.hp, a.sp, a.lifetime, a.anim0]));
    h.write(a.anim_hit as u32);
    match &a.kind {
        ActorKind::Player(p) => {
            h.write(p.client as u32);
            h.write(p.input);
            h.write(u32::from_le_bytes([p.trig, p.detune, p.mags, 0]));
            for s in &p.slots {
                h.write(u32::from_le_bytes([s.weapon, s.ammo, s.reload, 0]));
            }
        }
        ActorKind::Bullet(b) => {
            h.write(b.owner as u32);
            h.write(b.damage as u32);
        }
        ActorKind::Item(i) => {
            h.write(u32::from_le_bytes([i.weapon, i.ammo, 0, 0]));
        }
        ActorKind::Barrel | ActorKind::Tree => {}
    }
}

/// Per-tick state summary exchanged between peers to detect divergence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub tick: Tick,
    pub seed: u32,
    pub next_id: u32,
    pub digest: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_id_ascending() {
        let mut state = StateData::new(1, 2);
        let a = state.alloc_id();
        let b = state.alloc_id();
        assert!(b > a);
        assert_eq!(state.next_id, b + 1);
    }

    #[test]
    fn test_digest_ignores_stat_insertion_order() {
        let mut a = StateData::new(1, 2);
        a.stat_mut(5).frags = 1;
        a.stat_mut(-3).scores = 2;

        let mut b = StateData::new(1, 2);
        b.stat_mut(-3).scores = 2;
        b.stat_mut(5).frags = 1;

        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_sees_actor_changes() {
        let mut a = StateData::new(1, 2);
        let id = a.alloc_id();
        a.barrels.push(Actor::new(id, ActorKind::Barrel, 100, 100));
        let before = a.digest();
        a.barrels[0].x += 1;
        assert_ne!(before, a.digest());
    }

    #[test]
    fn test_sort_actors() {
        let mut state = StateData::new(1, 2);
        state.items.push(Actor::new(9, ActorKind::Barrel, 0, 0));
        state.items.push(Actor::new(3, ActorKind::Barrel, 0, 0));
        state.sort_actors();
        assert_eq!(state.items[0].id, 3);
    }
}
