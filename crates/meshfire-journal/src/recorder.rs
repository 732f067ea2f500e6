//! Building a replay while a session runs

use crate::error::{Error, Result};
use crate::replay::{Replay, ReplayMetadata};
use meshfire_core::{ClientEvent, ClientId, GameTuning, RoomConfig, StateData, Tick};
use tracing::{debug, info};

/// Collects the starting state and every applied event
///
/// Feed it the events a session applied (`Session::take_applied`) together
/// with the state they produced.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    metadata: ReplayMetadata,
    snapshot: Option<StateData>,
    events: Vec<ClientEvent>,
}

impl ReplayRecorder {
    pub fn new(room: RoomConfig, tuning: GameTuning) -> Self {
        Self {
            metadata: ReplayMetadata::new(room, tuning),
            snapshot: None,
            events: Vec::new(),
        }
    }

    pub fn set_name(&mut self, client: ClientId, name: impl Into<String>) {
        self.metadata.names.insert(client, name.into());
    }

    /// Begin (or restart) the recording at `state`
    pub fn start(&mut self, state: &StateData) {
        self.snapshot = Some(state.clone());
        self.events.clear();
        self.metadata.last_tick = state.tick;
        info!(tick = state.tick, "recording started");
    }

    pub fn is_started(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Append events applied up to and including `state.tick`
    ///
    /// Events from before the recording started are skipped.
    pub fn record(&mut self, state: &StateData, applied: &[ClientEvent]) {
        let Some(first) = self.snapshot.as_ref().map(|s| s.tick) else {
            return;
        };
        self.events.extend(
            applied
                .iter()
                .filter(|e| e.tick > first && e.tick <= state.tick),
        );
        self.metadata.last_tick = self.metadata.last_tick.max(state.tick);
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn last_tick(&self) -> Tick {
        self.metadata.last_tick
    }

    pub fn finish(self) -> Result<Replay> {
        let snapshot = self.snapshot.ok_or(Error::NotStarted)?;
        debug!(
            first = snapshot.tick,
            last = self.metadata.last_tick,
            events = self.events.len(),
            "recording finished"
        );
        Ok(Replay {
            metadata: self.metadata,
            snapshot,
            events: self.events,
        })
    }
}
