//! Replay playback

use crate::error::{Error, Result};
use crate::replay::Replay;
use meshfire_core::{SimulationContext, StateData, Tick};
use tracing::debug;

/// Re-runs a recorded session tick by tick
///
/// Playback is the ordinary simulation step fed from the recorded event
/// stream, so it only reproduces the session on the build that recorded
/// it; [`ReplayPlayer::new`] checks that first.
pub struct ReplayPlayer {
    replay: Replay,
    ctx: SimulationContext,
    /// Index of the first event not yet applied
    cursor: usize,
}

impl ReplayPlayer {
    pub fn new(replay: Replay) -> Result<Self> {
        replay.check_build()?;
        let ctx = SimulationContext::from_state(
            replay.snapshot.clone(),
            &replay.metadata.room,
            replay.metadata.tuning.clone(),
        )?;
        Ok(Self {
            replay,
            ctx,
            cursor: 0,
        })
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn state(&self) -> &StateData {
        &self.ctx.state
    }

    pub fn tick(&self) -> Tick {
        self.ctx.state.tick
    }

    /// Reached the last recorded tick
    pub fn finished(&self) -> bool {
        self.tick() >= self.replay.last_tick()
    }

    /// Simulate the next tick; `false` once finished
    pub fn step_forward(&mut self) -> bool {
        if self.finished() {
            return false;
        }
        let next = self.tick() + 1;
        let events = &self.replay.events;
        let start = self.cursor;
        while self.cursor < events.len() && events[self.cursor].tick <= next {
            self.cursor += 1;
        }
        self.ctx.step(&events[start..self.cursor]);
        true
    }

    /// Back to the recorded snapshot
    pub fn rewind(&mut self) {
        self.ctx.replace_state(self.replay.snapshot.clone());
        self.cursor = 0;
    }

    /// Jump to `tick`, re-simulating from the snapshot when going backwards
    pub fn goto(&mut self, tick: Tick) -> Result<()> {
        let (first, last) = (self.replay.first_tick(), self.replay.last_tick());
        if tick < first || tick > last {
            return Err(Error::TickOutOfRange { tick, first, last });
        }
        if tick < self.tick() {
            self.rewind();
        }
        while self.tick() < tick && self.step_forward() {}
        debug!(tick, "replay positioned");
        Ok(())
    }
}
