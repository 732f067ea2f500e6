//! Phase 6: bullet flight and hits

use super::bodies::slide;
use super::combat::Target;
use super::SimulationContext;
use crate::actor::Actor;
use crate::math::{angle_of, polar, TRIG_ONE};

/// Random velocity jitter added on every bounce
const BOUNCE_JITTER: i32 = 16;

impl SimulationContext {
    pub(super) fn update_bullets(&mut self) {
        self.player_grid.rebuild(&self.state.players);
        self.barrel_grid.rebuild(&self.state.barrels);
        let mut found = std::mem::take(&mut self.scratch);

        for bi in 0..self.state.bullets.len() {
            let ray = self.tuning.weapon(self.state.bullets[bi].subtype).ray;
            {
                let b = &mut self.state.bullets[bi];
                if !b.is_alive() {
                    continue;
                }
                b.lifetime = b.lifetime.saturating_sub(1);
                if b.lifetime == 0 {
                    b.hp = 0;
                    continue;
                }
                // rays were resolved when fired; only the trace remains
                if ray {
                    continue;
                }
                let Actor { x, y, u, v, .. } = &mut *b;
                if slide(&self.map, x, y, u, v, true) {
                    b.hp = b.hp.saturating_sub(1);
                    if b.hp == 0 {
                        continue;
                    }
                }
            }
            if let Some(target) = self.bullet_target(bi, &mut found) {
                self.bullet_hit(bi, target);
            }
        }
        self.scratch = found;
    }

    /// First body a bullet overlaps: players, then barrels, then trees
    ///
    /// Players sharing the bullet's owner id are never hit. The grids are
    /// built before any bullet moves, so bodies killed earlier in the tick
    /// are still bucketed and have to be skipped here.
    fn bullet_target(&self, bi: usize, found: &mut Vec<usize>) -> Option<Target> {
        let b = &self.state.bullets[bi];
        let owner = b.bullet()?.owner;
        let br = self.tuning.bullet_radius;

        self.player_grid.query(
            &self.state.players,
            b.x,
            b.y,
            br + self.tuning.player_radius,
            false,
            found,
        );
        if let Some(&i) = found.iter().find(|&&i| {
            let p = &self.state.players[i];
            p.is_alive() && p.owner_id() != Some(owner)
        }) {
            return Some(Target::Player(i));
        }

        self.barrel_grid.query(
            &self.state.barrels,
            b.x,
            b.y,
            br + self.tuning.barrel_radius,
            false,
            found,
        );
        if let Some(&i) = found.iter().find(|&&i| self.state.barrels[i].is_alive()) {
            return Some(Target::Barrel(i));
        }

        self.tree_grid.query(
            &self.map.trees,
            b.x,
            b.y,
            br + self.tuning.tree_radius,
            false,
            found,
        );
        found.first().map(|&i| Target::Tree(i))
    }

    /// Damage the target, then spend one bullet hit point and bounce
    ///
    /// The velocity is reflected about the contact normal with a little
    /// random jitter and the bullet is placed just outside the target.
    fn bullet_hit(&mut self, bi: usize, target: Target) {
        let b = &self.state.bullets[bi];
        let (bx, by, u, v) = (b.x, b.y, b.u, b.v);
        let Some(data) = b.bullet().copied() else {
            return;
        };
        let (tx, ty, tr) = self.target_body(target);

        self.hit(target, data.damage, (u / 4, v / 4), data.owner);

        let contact = tr + self.tuning.bullet_radius + 1;
        let normal = angle_of(bx - tx, by - ty);
        let (nx, ny) = polar(normal, TRIG_ONE);
        let dot = (u as i64 * nx as i64 + v as i64 * ny as i64) / TRIG_ONE as i64;
        let (mut nu, mut nv) = (u, v);
        if dot < 0 {
            nu -= (2 * dot * nx as i64 / TRIG_ONE as i64) as i32;
            nv -= (2 * dot * ny as i64 / TRIG_ONE as i64) as i32;
        }

        let b = &mut self.state.bullets[bi];
        b.hp = b.hp.saturating_sub(1);
        if b.hp == 0 {
            return;
        }
        let (cx, cy) = polar(normal, contact);
        b.x = tx + cx;
        b.y = ty + cy;
        b.u = nu + self.rng.spread(BOUNCE_JITTER);
        b.v = nv + self.rng.spread(BOUNCE_JITTER);
    }
}

#[cfg(test)]
mod tests {
    use crate::actor::{Actor, ActorKind, BulletData};
    use crate::map::GameMap;
    use crate::sim::tests::open_context;

    fn bullet(ctx: &mut crate::sim::SimulationContext, x: i32, y: i32, u: i32, hp: u8) {
        let id = ctx.state.alloc_id();
        let mut b = Actor::new(id, ActorKind::Bullet(BulletData { owner: 1, damage: 1 }), x, y);
        b.subtype = 1;
        b.u = u;
        b.hp = hp;
        b.lifetime = 50;
        ctx.state.bullets.push(b);
    }

    #[test]
    fn test_wall_bounce_costs_hit_point() {
        let mut ctx = open_context();
        let wall = GameMap::open(0);
        assert!(wall.is_solid(2000, 5000));
        bullet(&mut ctx, 2300, 5000, -500, 2);
        ctx.step(&[]);
        let b = &ctx.state.bullets[0];
        assert_eq!(b.hp, 1);
        assert_eq!(b.u, 500);
        assert_eq!(b.x, 2300);
    }

    #[test]
    fn test_last_bounce_removes_bullet() {
        let mut ctx = open_context();
        bullet(&mut ctx, 2300, 5000, -500, 1);
        ctx.step(&[]);
        assert!(ctx.state.bullets.is_empty());
    }

    #[test]
    fn test_bullet_expires() {
        let mut ctx = open_context();
        bullet(&mut ctx, 20_000, 20_000, 10, 1);
        ctx.state.bullets[0].lifetime = 1;
        ctx.step(&[]);
        assert!(ctx.state.bullets.is_empty());
    }

    #[test]
    fn test_bullet_breaks_barrel() {
        let mut ctx = open_context();
        let id = ctx.state.alloc_id();
        let mut crate_ = Actor::new(id, ActorKind::Barrel, 20_000, 20_000);
        crate_.hp = 1;
        ctx.state.barrels.push(crate_);
        bullet(&mut ctx, 19_400, 20_000, 500, 1);
        ctx.step(&[]);
        assert!(ctx.state.barrels.is_empty());
        assert!(ctx.state.bullets.is_empty());
        assert!(!ctx.state.items.is_empty());
    }

    #[test]
    fn test_second_bullet_passes_through_broken_barrel() {
        let mut ctx = open_context();
        let id = ctx.state.alloc_id();
        let mut crate_ = Actor::new(id, ActorKind::Barrel, 20_000, 20_000);
        crate_.hp = 1;
        ctx.state.barrels.push(crate_);
        bullet(&mut ctx, 19_400, 20_000, 500, 1);
        bullet(&mut ctx, 19_400, 20_000, 500, 2);
        ctx.step(&[]);
        assert!(ctx.state.barrels.is_empty());
        assert_eq!(ctx.state.bullets.len(), 1);
        let b = &ctx.state.bullets[0];
        assert_eq!(b.hp, 2);
        assert_eq!(b.u, 500);
    }
}
