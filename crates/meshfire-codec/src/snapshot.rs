//! Full-state snapshots
//!
//! ```text
//! [next_id][tick][seed][map_seed][actor count]
//! actors: players, barrels, bullets, items (each list in id order)
//! [stat count] ([client][frags][scores])*   sorted by client
//! ```
//!
//! Trees are rebuilt from the map seed and never appear in a snapshot.

use crate::actor::{decode_actor, encode_actor};
use crate::error::{Error, Result};
use crate::words::{WordReader, WordWriter};
use meshfire_core::{ActorType, PlayerStat, StateData};

pub fn encode_snapshot(w: &mut WordWriter, state: &StateData) {
    w.push(state.next_id);
    w.push(state.tick);
    w.push(state.seed);
    w.push(state.map_seed);
    w.push(state.actor_count() as u32);
    for list in state.lists() {
        for actor in list {
            encode_actor(w, actor);
        }
    }

    let mut stats: Vec<_> = state.stats.iter().collect();
    stats.sort_by_key(|(client, _)| **client);
    w.push(stats.len() as u32);
    for (client, stat) in stats {
        w.push_i32(*client);
        w.push(stat.frags);
        w.push(stat.scores);
    }
}

pub fn decode_snapshot(r: &mut WordReader<'_>) -> Result<StateData> {
    let next_id = r.next()?;
    let tick = r.next()?;
    let seed = r.next()?;
    let map_seed = r.next()?;

    let mut state = StateData::new(seed, map_seed);
    state.next_id = next_id;
    state.tick = tick;

    let count = r.next()?;
    for _ in 0..count {
        let actor = decode_actor(r)?;
        let list = match actor.actor_type() {
            ActorType::Player => &mut state.players,
            ActorType::Barrel => &mut state.barrels,
            ActorType::Bullet => &mut state.bullets,
            ActorType::Item => &mut state.items,
            ActorType::Tree => return Err(Error::UnexpectedActorType(ActorType::Tree.tag())),
        };
        list.push(actor);
    }

    let stat_count = r.next()?;
    for _ in 0..stat_count {
        let client = r.next_i32()?;
        let frags = r.next()?;
        let scores = r.next()?;
        state.stats.insert(client, PlayerStat { frags, scores });
    }
    Ok(state)
}

/// Encode a snapshot on its own, as little-endian bytes
pub fn snapshot_to_bytes(state: &StateData) -> Vec<u8> {
    let mut w = WordWriter::new();
    encode_snapshot(&mut w, state);
    w.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfire_core::actor::{BulletData, ItemData, PlayerData, WeaponSlot};
    use meshfire_core::{Actor, ActorKind};

    fn busy_state() -> StateData {
        let mut s = StateData::new(0xabcd_1234, 77);
        s.tick = 512;
        let id = s.alloc_id();
        let mut p = Actor::new(
            id,
            ActorKind::Player(PlayerData {
                client: 3,
                input: 0x0102_0304,
                slots: [WeaponSlot { weapon: 1, ammo: 12, reload: 0 }, WeaponSlot::default()],
                ..Default::default()
            }),
            1000,
            2000,
        );
        p.hp = 10;
        s.players.push(p);
        let id = s.alloc_id();
        s.barrels.push(Actor::new(id, ActorKind::Barrel, 3000, 3000));
        let id = s.alloc_id();
        s.bullets.push(Actor::new(
            id,
            ActorKind::Bullet(BulletData { owner: 3, damage: 2 }),
            1100,
            2000,
        ));
        let id = s.alloc_id();
        s.items
            .push(Actor::new(id, ActorKind::Item(ItemData { weapon: 0, ammo: 0 }), 50, 60));
        s.stat_mut(3).frags = 2;
        s.stat_mut(-9).scores = 5;
        s
    }

    #[test]
    fn test_snapshot_round_trip_with_stats() {
        let state = busy_state();
        let mut w = WordWriter::new();
        encode_snapshot(&mut w, &state);
        let mut r = WordReader::new(w.words());
        let back = decode_snapshot(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(back, state);
        assert_eq!(back.digest(), state.digest());
    }

    #[test]
    fn test_stats_written_in_client_order() {
        let state = busy_state();
        let mut w = WordWriter::new();
        encode_snapshot(&mut w, &state);
        let words = w.words();
        // stats table is the last 7 words
        let tail = &words[words.len() - 7..];
        assert_eq!(tail[0], 2);
        assert_eq!(tail[1] as i32, -9);
        assert_eq!(tail[4], 3);
    }

    #[test]
    fn test_tree_in_snapshot_rejected() {
        let mut w = WordWriter::new();
        w.push(1);
        w.push(0);
        w.push(0);
        w.push(0);
        w.push(1);
        encode_actor(&mut w, &Actor::new(0x8000_0000, ActorKind::Tree, 0, 0));
        w.push(0);
        let mut r = WordReader::new(w.words());
        assert_eq!(
            decode_snapshot(&mut r),
            Err(Error::UnexpectedActorType(ActorType::Tree.tag()))
        );
    }
}
