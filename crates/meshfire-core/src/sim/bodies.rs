//! Phases 3 and 8: free-body physics and overlap resolution

use super::SimulationContext;
use crate::actor::Actor;
use crate::map::GameMap;
use crate::math::{angle_of, length, polar};

/// Move by `(u, v)` one axis at a time, stopping or reflecting at walls
///
/// Returns true when either axis hit a wall.
pub(super) fn slide(
    map: &GameMap,
    x: &mut i32,
    y: &mut i32,
    u: &mut i32,
    v: &mut i32,
    bounce: bool,
) -> bool {
    let mut blocked = false;
    let nx = *x + *u;
    if map.is_solid(nx, *y) {
        *u = if bounce { -*u } else { 0 };
        blocked = true;
    } else {
        *x = nx;
    }
    let ny = *y + *v;
    if map.is_solid(*x, ny) {
        *v = if bounce { -*v } else { 0 };
        blocked = true;
    } else {
        *y = ny;
    }
    blocked
}

/// Friction, gravity and wall-stopping movement for barrels and items
pub(super) fn integrate(map: &GameMap, a: &mut Actor, gravity: i32) {
    a.anim_hit = a.anim_hit.saturating_sub(1);
    a.u -= a.u / 4;
    a.v -= a.v / 4;
    if a.z > 0 || a.w != 0 {
        a.z += a.w;
        a.w -= gravity;
        if a.z <= 0 {
            a.z = 0;
            a.w = 0;
        }
    }
    let Actor { x, y, u, v, .. } = a;
    slide(map, x, y, u, v, false);
}

fn nudge(map: &GameMap, a: &mut Actor, dx: i32, dy: i32) {
    if !map.is_solid(a.x + dx, a.y + dy) {
        a.x += dx;
        a.y += dy;
    }
}

/// Push `a` fully out of a static body at `(sx, sy)`
fn push_out(map: &GameMap, a: &mut Actor, sx: i32, sy: i32, min_dist: i32) {
    let (dx, dy) = (a.x - sx, a.y - sy);
    let overlap = min_dist - length(dx, dy);
    if overlap > 0 {
        let (px, py) = polar(angle_of(dx, dy), overlap);
        nudge(map, a, px, py);
    }
}

/// Push two bodies apart, half the overlap each
fn separate(map: &GameMap, a: &mut Actor, b: &mut Actor, min_dist: i32) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let overlap = min_dist - length(dx, dy);
    if overlap > 0 {
        let (px, py) = polar(angle_of(dx, dy), (overlap + 1) / 2);
        nudge(map, a, -px, -py);
        nudge(map, b, px, py);
    }
}

fn pair_mut(list: &mut [Actor], i: usize, j: usize) -> (&mut Actor, &mut Actor) {
    if i < j {
        let (left, right) = list.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = list.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

impl SimulationContext {
    pub(super) fn update_barrels(&mut self) {
        for barrel in &mut self.state.barrels {
            integrate(&self.map, barrel, self.tuning.gravity);
        }
    }

    /// Phase 8
    ///
    /// Players are resolved against trees, barrels and other players, then
    /// barrels against trees and other barrels. The resolved flag keeps each
    /// symmetric pair from being handled twice.
    pub(super) fn resolve_bodies(&mut self) {
        let (pr, br, tr) = (
            self.tuning.player_radius,
            self.tuning.barrel_radius,
            self.tuning.tree_radius,
        );
        self.player_grid.rebuild(&self.state.players);
        self.barrel_grid.rebuild(&self.state.barrels);
        let mut found = std::mem::take(&mut self.scratch);

        for i in 0..self.state.players.len() {
            self.state.players[i].resolved = true;

            let (x, y) = (self.state.players[i].x, self.state.players[i].y);
            self.tree_grid
                .query(&self.map.trees, x, y, pr + tr, false, &mut found);
            for &t in &found {
                let (tx, ty) = (self.map.trees[t].x, self.map.trees[t].y);
                push_out(&self.map, &mut self.state.players[i], tx, ty, pr + tr);
            }

            let (x, y) = (self.state.players[i].x, self.state.players[i].y);
            self.barrel_grid
                .query(&self.state.barrels, x, y, pr + br, false, &mut found);
            for &b in &found {
                separate(
                    &self.map,
                    &mut self.state.players[i],
                    &mut self.state.barrels[b],
                    pr + br,
                );
            }

            let (x, y) = (self.state.players[i].x, self.state.players[i].y);
            self.player_grid
                .query(&self.state.players, x, y, 2 * pr, true, &mut found);
            for &j in &found {
                let (a, b) = pair_mut(&mut self.state.players, i, j);
                separate(&self.map, a, b, 2 * pr);
            }
        }

        for i in 0..self.state.barrels.len() {
            self.state.barrels[i].resolved = true;

            let (x, y) = (self.state.barrels[i].x, self.state.barrels[i].y);
            self.tree_grid
                .query(&self.map.trees, x, y, br + tr, false, &mut found);
            for &t in &found {
                let (tx, ty) = (self.map.trees[t].x, self.map.trees[t].y);
                push_out(&self.map, &mut self.state.barrels[i], tx, ty, br + tr);
            }

            let (x, y) = (self.state.barrels[i].x, self.state.barrels[i].y);
            self.barrel_grid
                .query(&self.state.barrels, x, y, 2 * br, true, &mut found);
            for &j in &found {
                let (a, b) = pair_mut(&mut self.state.barrels, i, j);
                separate(&self.map, a, b, 2 * br);
            }
        }

        self.scratch = found;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorKind;
    use crate::math::dist_sq;
    use crate::sim::tests::{add_player, open_context};

    #[test]
    fn test_slide_stops_at_wall() {
        let map = GameMap::open(0);
        let (mut x, mut y, mut u, mut v) = (2100, 5000, -200, 0);
        assert!(slide(&map, &mut x, &mut y, &mut u, &mut v, false));
        assert_eq!((x, u), (2100, 0));

        let (mut x, mut u) = (2100, -200);
        slide(&map, &mut x, &mut y, &mut u, &mut v, true);
        assert_eq!((x, u), (2100, 200));
    }

    #[test]
    fn test_overlapping_players_are_pushed_apart() {
        let mut ctx = open_context();
        add_player(&mut ctx, 1, 20_000, 20_000);
        add_player(&mut ctx, 2, 20_300, 20_000);
        ctx.step(&[]);
        let (a, b) = (&ctx.state.players[0], &ctx.state.players[1]);
        let min = 2 * ctx.tuning.player_radius as i64;
        assert!(dist_sq(a.x, a.y, b.x, b.y) >= (min - 2) * (min - 2));
        assert!(a.x < 20_000 && b.x > 20_300);
    }

    #[test]
    fn test_barrel_pushed_by_player() {
        let mut ctx = open_context();
        add_player(&mut ctx, 1, 20_000, 20_000);
        let id = ctx.state.alloc_id();
        let mut crate_ = Actor::new(id, ActorKind::Barrel, 20_000, 20_400);
        crate_.hp = 4;
        ctx.state.barrels.push(crate_);
        ctx.step(&[]);
        assert!(ctx.state.barrels[0].y > 20_400);
    }

    fn crate_at(ctx: &mut SimulationContext, x: i32, y: i32) {
        let id = ctx.state.alloc_id();
        let mut crate_ = Actor::new(id, ActorKind::Barrel, x, y);
        crate_.hp = 4;
        ctx.state.barrels.push(crate_);
    }

    #[test]
    fn test_cross_cell_overlap_resolved_only_from_the_left() {
        // 700 apart across the cell boundary at x = 20480
        let (left, right) = (20_380, 21_080);

        // the left crate comes first and its query reaches the right cell
        let mut ctx = open_context();
        crate_at(&mut ctx, left, 20_000);
        crate_at(&mut ctx, right, 20_000);
        ctx.step(&[]);
        assert!(ctx.state.barrels[0].x < left);
        assert!(ctx.state.barrels[1].x > right);

        // the right crate comes first and misses its left neighbour; the
        // left one then skips it as already resolved
        let mut ctx = open_context();
        crate_at(&mut ctx, right, 20_000);
        crate_at(&mut ctx, left, 20_000);
        ctx.step(&[]);
        assert_eq!(ctx.state.barrels[0].x, right);
        assert_eq!(ctx.state.barrels[1].x, left);
    }
}
