//! Uniform spatial grid
//!
//! One cell is one map tile, so a cell always contains the largest
//! interaction radius ([`crate::config::MAX_RADIUS`] is half a cell). The
//! grid is rebuilt from scratch each time it is needed; buckets hold indices
//! into the actor list the grid was built from, in list (id) order.
//!
//! A query scans four cells only: the cell containing `(x - reach/2,
//! y - reach/2)` plus its right, lower and lower-right neighbours. This is an
//! approximation that can miss actors near cell boundaries. Every peer
//! applies it identically, so it never causes disagreement.

use crate::actor::Actor;
use crate::math::dist_sq;

pub const GRID_SHIFT: u32 = 11;
pub const GRID_SIZE: usize = 32;

/// Bucketed actor indices
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![Vec::new(); GRID_SIZE * GRID_SIZE],
        }
    }

    fn cell_coord(v: i32) -> i32 {
        v >> GRID_SHIFT
    }

    fn bucket(cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx >= GRID_SIZE as i32 || cy >= GRID_SIZE as i32 {
            return None;
        }
        Some(cy as usize * GRID_SIZE + cx as usize)
    }

    /// Clear and refill the grid from a list; dead actors are skipped
    pub fn rebuild(&mut self, actors: &[Actor]) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for (i, a) in actors.iter().enumerate() {
            if !a.is_alive() {
                continue;
            }
            let cx = Self::cell_coord(a.x).clamp(0, GRID_SIZE as i32 - 1);
            let cy = Self::cell_coord(a.y).clamp(0, GRID_SIZE as i32 - 1);
            if let Some(b) = Self::bucket(cx, cy) {
                self.cells[b].push(i);
            }
        }
    }

    /// Collect indices of actors within `reach` of `(x, y)`
    ///
    /// `reach` is the sum of both interaction radii and must not exceed a
    /// cell. With `skip_resolved`, actors already flagged resolved this tick
    /// are left out.
    pub fn query(
        &self,
        actors: &[Actor],
        x: i32,
        y: i32,
        reach: i32,
        skip_resolved: bool,
        out: &mut Vec<usize>,
    ) {
        out.clear();
        let half = reach / 2;
        let cx = Self::cell_coord(x - half);
        let cy = Self::cell_coord(y - half);
        let reach_sq = reach as i64 * reach as i64;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let Some(b) = Self::bucket(cx + dx, cy + dy) else {
                continue;
            };
            for &i in &self.cells[b] {
                let a = &actors[i];
                if skip_resolved && a.resolved {
                    continue;
                }
                if dist_sq(a.x, a.y, x, y) <= reach_sq {
                    out.push(i);
                }
            }
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new()
    }
}
