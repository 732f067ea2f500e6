//! Session tuning

use meshfire_core::{RoomConfig, Tick};
use serde::{Deserialize, Serialize};

/// Timing and safety knobs of a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of one tick in milliseconds
    pub tick_ms: f64,
    /// Minimum ticks between scheduling a local input and applying it
    pub input_delay: Tick,
    /// Upper bound on speculative ticks for rendering
    pub prediction_ticks: Tick,
    /// Attach fingerprints to packets and compare incoming ones
    pub debug_checks: bool,
    /// Also attach full state copies, for field-level desync reports
    pub echo_state: bool,
    /// Most ticks one update may run
    pub max_catch_up: u32,
    /// Fraction of the lead error corrected per update
    pub drift_gain: f64,
    /// Disconnected ticks after which a ready peer is declared lost
    pub peer_timeout_ticks: u32,
    /// Time a new peer has to come up before the connection is given up
    pub join_timeout_ms: f64,
    /// Interval between snapshot resends to a peer still syncing
    pub snapshot_resend_ms: f64,
    /// Ticks of fingerprint history
    pub history_ticks: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_room(&RoomConfig::default())
    }
}

impl SessionConfig {
    pub fn from_room(room: &RoomConfig) -> Self {
        Self {
            tick_ms: room.tick_ms(),
            input_delay: room.input_delay(),
            prediction_ticks: room.prediction_ticks(),
            debug_checks: room.debug_checks,
            echo_state: false,
            max_catch_up: room.tick_rate() / 2,
            drift_gain: 0.05,
            peer_timeout_ticks: room.tick_rate() * 5,
            join_timeout_ms: 10_000.0,
            snapshot_resend_ms: 250.0,
            history_ticks: 256,
        }
    }

    /// Lead over the horizon the scheduler steers toward
    pub fn target_lead(&self) -> Tick {
        self.input_delay / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_room() {
        let mut room = RoomConfig::default();
        room.set_tick_rate(30);
        room.set_input_delay(6);
        let config = SessionConfig::from_room(&room);
        assert_eq!(config.input_delay, 6);
        assert_eq!(config.target_lead(), 3);
        assert_eq!(config.peer_timeout_ticks, 150);
        assert!((config.tick_ms - 1000.0 / 30.0).abs() < 1e-9);
    }
}
