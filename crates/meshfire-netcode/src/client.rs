//! Per-peer bookkeeping
//!
//! A [`Client`] exists for every remote peer from first contact until it
//! disconnects. Nothing in here is replicated.

use meshfire_core::{ClientId, Tick};

/// Weight of a new round-trip sample in the smoothed estimate
const RTT_SMOOTHING: f64 = 0.125;

/// What the local peer knows about one remote peer
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: ClientId,
    /// Last tick the peer has supplied all of its inputs through
    pub tick: Tick,
    /// Last of our ticks the peer has confirmed receiving; never decreases
    pub acknowledged_tick: Tick,
    /// At least one packet from the peer has arrived
    pub heard: bool,
    /// The peer holds a state and simulates
    pub ready: bool,
    /// The peer has crossed the join barrier and sends inputs
    pub is_playing: bool,
    /// Peer's most recent send timestamp, echoed back as `ts1`
    pub last_ts0: u32,
    /// Smoothed round-trip time in milliseconds
    pub rtt_ms: Option<f64>,
    /// When the record was created, for the join timeout
    pub added_at_ms: f64,
    /// The transport has been seen connected at least once
    pub ever_connected: bool,
    /// Start of the current disconnected stretch
    pub disconnected_since_ms: Option<f64>,
    /// Last time a snapshot was sent to this peer
    pub snapshot_sent_ms: Option<f64>,
}

impl Client {
    pub fn new(id: ClientId, now_ms: f64) -> Self {
        Self {
            id,
            tick: 0,
            acknowledged_tick: 0,
            heard: false,
            ready: false,
            is_playing: false,
            last_ts0: 0,
            rtt_ms: None,
            added_at_ms: now_ms,
            ever_connected: false,
            disconnected_since_ms: None,
            snapshot_sent_ms: None,
        }
    }

    /// Record the peer's acknowledgement of our ticks
    ///
    /// Packets arrive in any order; an older acknowledgement never moves the
    /// record backwards.
    pub fn acknowledge(&mut self, tick: Tick) {
        self.acknowledged_tick = self.acknowledged_tick.max(tick);
    }

    /// Fold a round-trip sample into the estimate
    pub fn observe_rtt(&mut self, sample_ms: f64) {
        self.rtt_ms = Some(match self.rtt_ms {
            Some(rtt) => rtt + (sample_ms - rtt) * RTT_SMOOTHING,
            None => sample_ms,
        });
    }

    /// One-way latency expressed in ticks, rounded up
    pub fn jitter_ticks(&self, tick_ms: f64) -> Tick {
        match self.rtt_ms {
            Some(rtt) if tick_ms > 0.0 => (rtt / 2.0 / tick_ms).ceil() as Tick,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledge_is_monotonic() {
        let mut c = Client::new(2, 0.0);
        let mut seen = Vec::new();
        for ack in [5, 3, 9, 9, 1, 12, 0, 11] {
            c.acknowledge(ack);
            seen.push(c.acknowledged_tick);
        }
        assert_eq!(seen, vec![5, 5, 9, 9, 9, 12, 12, 12]);
    }

    #[test]
    fn test_rtt_smoothing() {
        let mut c = Client::new(2, 0.0);
        assert_eq!(c.jitter_ticks(16.0), 0);
        c.observe_rtt(80.0);
        assert_eq!(c.rtt_ms, Some(80.0));
        c.observe_rtt(160.0);
        assert_eq!(c.rtt_ms, Some(90.0));
        // 45 ms one way at 16 ms per tick
        assert_eq!(c.jitter_ticks(16.0), 3);
    }
}
