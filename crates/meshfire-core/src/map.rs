//! Static tile map and trees
//!
//! The map is regenerated from `StateData::map_seed` on every peer, so it is
//! never sent over the wire. Trees are static actors that live here rather
//! than in the replicated state; only their hit-flash counter changes.

use crate::actor::{Actor, ActorKind};
use crate::layout::HP_MAX;
use crate::rng::GameRng;

/// Tile edge length as a shift (2048 units)
pub const TILE_SHIFT: u32 = 11;
pub const TILE_SIZE: i32 = 1 << TILE_SHIFT;
/// Tiles per map edge
pub const MAP_TILES: usize = 32;
/// World units per map edge
pub const WORLD_SIZE: i32 = TILE_SIZE * MAP_TILES as i32;

/// Tree actor ids live above every id the state allocator hands out
pub const TREE_ID_BASE: u32 = 0x8000_0000;

const WALL_TILES: u32 = 40;
const TREE_COUNT: u32 = 20;
const TREE_KINDS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tile {
    Floor = 0,
    Wall = 1,
}

/// Tiles plus static trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMap {
    pub seed: u32,
    tiles: Vec<Tile>,
    pub trees: Vec<Actor>,
}

impl GameMap {
    /// Generate the map for a seed
    pub fn generate(seed: u32) -> Self {
        let mut rng = GameRng::new(seed);
        let mut map = Self::open(seed);

        for _ in 0..WALL_TILES {
            let tx = 1 + rng.below(MAP_TILES as u32 - 2) as usize;
            let ty = 1 + rng.below(MAP_TILES as u32 - 2) as usize;
            map.tiles[ty * MAP_TILES + tx] = Tile::Wall;
        }

        for i in 0..TREE_COUNT {
            let (x, y) = map.random_floor_position(&mut rng);
            let mut tree = Actor::new(
                TREE_ID_BASE + i,
                ActorKind::Tree,
                x + rng.spread(TILE_SIZE / 4),
                y + rng.spread(TILE_SIZE / 4),
            );
            tree.subtype = rng.below(TREE_KINDS) as u8;
            tree.anim0 = rng.byte();
            tree.hp = HP_MAX;
            map.trees.push(tree);
        }
        map
    }

    /// A map with only the border walls and no trees
    pub fn open(seed: u32) -> Self {
        let mut tiles = vec![Tile::Floor; MAP_TILES * MAP_TILES];
        for i in 0..MAP_TILES {
            tiles[i] = Tile::Wall;
            tiles[(MAP_TILES - 1) * MAP_TILES + i] = Tile::Wall;
            tiles[i * MAP_TILES] = Tile::Wall;
            tiles[i * MAP_TILES + MAP_TILES - 1] = Tile::Wall;
        }
        Self {
            seed,
            tiles,
            trees: Vec::new(),
        }
    }

    /// Tile at tile coordinates; outside the map counts as wall
    pub fn tile(&self, tx: i32, ty: i32) -> Tile {
        if tx < 0 || ty < 0 || tx >= MAP_TILES as i32 || ty >= MAP_TILES as i32 {
            return Tile::Wall;
        }
        self.tiles[ty as usize * MAP_TILES + tx as usize]
    }

    /// Check whether a world position is inside a wall
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.tile(x >> TILE_SHIFT, y >> TILE_SHIFT) == Tile::Wall
    }

    /// Set a tile; out-of-range coordinates are ignored
    pub fn set_tile(&mut self, tx: usize, ty: usize, tile: Tile) {
        if tx < MAP_TILES && ty < MAP_TILES {
            self.tiles[ty * MAP_TILES + tx] = tile;
        }
    }

    /// Center of a random floor tile
    ///
    /// Tries a bounded number of random tiles, then falls back to a scan from
    /// the last candidate so the result is always defined.
    pub fn random_floor_position(&self, rng: &mut GameRng) -> (i32, i32) {
        let mut idx = 0;
        for _ in 0..64 {
            idx = rng.below((MAP_TILES * MAP_TILES) as u32) as usize;
            if self.tiles[idx] == Tile::Floor {
                return Self::tile_center(idx);
            }
        }
        for step in 0..self.tiles.len() {
            let probe = (idx + step) % self.tiles.len();
            if self.tiles[probe] == Tile::Floor {
                return Self::tile_center(probe);
            }
        }
        (WORLD_SIZE / 2, WORLD_SIZE / 2)
    }

    fn tile_center(idx: usize) -> (i32, i32) {
        let tx = (idx % MAP_TILES) as i32;
        let ty = (idx / MAP_TILES) as i32;
        (tx * TILE_SIZE + TILE_SIZE / 2, ty * TILE_SIZE + TILE_SIZE / 2)
    }

    /// Hit-flash counters of every tree, for save/restore around prediction
    pub fn tree_flashes(&self) -> Vec<u8> {
        self.trees.iter().map(|t| t.anim_hit).collect()
    }

    pub fn restore_tree_flashes(&mut self, flashes: &[u8]) {
        for (tree, flash) in self.trees.iter_mut().zip(flashes) {
            tree.anim_hit = *flash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(GameMap::generate(42), GameMap::generate(42));
        assert_ne!(GameMap::generate(42), GameMap::generate(43));
    }

    #[test]
    fn test_border_is_solid() {
        let map = GameMap::open(0);
        assert!(map.is_solid(10, 10));
        assert!(map.is_solid(-1, 5000));
        assert!(map.is_solid(WORLD_SIZE, 5000));
        assert!(!map.is_solid(WORLD_SIZE / 2, WORLD_SIZE / 2));
    }

    #[test]
    fn test_floor_positions() {
        let map = GameMap::generate(7);
        let mut rng = GameRng::new(99);
        for _ in 0..50 {
            let (x, y) = map.random_floor_position(&mut rng);
            assert!(!map.is_solid(x, y));
        }
    }

    #[test]
    fn test_tree_ids_and_flash_restore() {
        let mut map = GameMap::generate(5);
        assert_eq!(map.trees.len(), TREE_COUNT as usize);
        assert!(map.trees.iter().all(|t| t.id >= TREE_ID_BASE));

        let saved = map.tree_flashes();
        map.trees[0].anim_hit = 9;
        map.restore_tree_flashes(&saved);
        assert_eq!(map.tree_flashes(), saved);
    }
}
