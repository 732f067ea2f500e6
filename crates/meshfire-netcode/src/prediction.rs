//! Speculative ticks for rendering
//!
//! Prediction runs a few ticks past the horizon with whatever inputs are
//! known (players keep their last input otherwise), hands the result to the
//! renderer and then puts everything back. It is a strict save/restore
//! around the authoritative context, not rollback with re-simulation.

use meshfire_core::{ClientEvent, SimEffect, SimulationContext, StateData, Tick};

/// Peer-local cosmetic state driven by simulation effects
///
/// Particles, screen shake and the like. Effects produced by predicted
/// ticks are applied too, so the implementation must be able to take a
/// snapshot of itself and return to it.
pub trait Cosmetics {
    type Snapshot;

    /// React to the effects of one tick
    fn apply(&mut self, effects: &[SimEffect], state: &StateData);

    fn save(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// No cosmetics, for headless peers
impl Cosmetics for () {
    type Snapshot = ();

    fn apply(&mut self, _effects: &[SimEffect], _state: &StateData) {}

    fn save(&self) {}

    fn restore(&mut self, _snapshot: ()) {}
}

/// Everything prediction may disturb
struct Rewind<S> {
    state: StateData,
    visual_rng: meshfire_core::GameRng,
    tree_flashes: Vec<u8>,
    effects: Vec<SimEffect>,
    hot_usable: Vec<meshfire_core::HotUsable>,
    cosmetics: S,
}

impl<S> Rewind<S> {
    fn capture<C: Cosmetics<Snapshot = S>>(ctx: &SimulationContext, cosmetics: &C) -> Self {
        Self {
            state: ctx.state.clone(),
            visual_rng: ctx.visual_rng,
            tree_flashes: ctx.map.tree_flashes(),
            effects: ctx.effects.clone(),
            hot_usable: ctx.hot_usable.clone(),
            cosmetics: cosmetics.save(),
        }
    }

    fn restore<C: Cosmetics<Snapshot = S>>(self, ctx: &mut SimulationContext, cosmetics: &mut C) {
        ctx.replace_state(self.state);
        ctx.visual_rng = self.visual_rng;
        ctx.map.restore_tree_flashes(&self.tree_flashes);
        ctx.effects = self.effects;
        ctx.hot_usable = self.hot_usable;
        cosmetics.restore(self.cosmetics);
    }
}

/// Run `ticks` speculative ticks, render, and restore
///
/// `due` supplies the known events of a tick. The context and cosmetics are
/// bit-identical before and after the call.
pub fn predict<C, R>(
    ctx: &mut SimulationContext,
    cosmetics: &mut C,
    ticks: Tick,
    due: impl Fn(Tick) -> Vec<ClientEvent>,
    render: impl FnOnce(&SimulationContext, &C) -> R,
) -> R
where
    C: Cosmetics,
{
    let rewind = Rewind::capture(ctx, cosmetics);
    for _ in 0..ticks {
        let events = due(ctx.state.tick + 1);
        ctx.step(&events);
        cosmetics.apply(&ctx.effects, &ctx.state);
    }
    let out = render(ctx, cosmetics);
    rewind.restore(ctx, cosmetics);
    out
}
