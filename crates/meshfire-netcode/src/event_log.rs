//! Tick-ordered event log
//!
//! Holds every known input event, local and remote, until it has been both
//! simulated and acknowledged. The log is append-only in meaning: events are
//! never edited, only pruned from the old end.

use meshfire_core::{ClientEvent, ClientId, Tick};
use std::collections::VecDeque;

/// Events sorted by tick; equal ticks keep insertion order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: VecDeque<ClientEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every event with the same or an earlier tick
    pub fn insert(&mut self, event: ClientEvent) {
        let at = self.events.partition_point(|e| e.tick <= event.tick);
        self.events.insert(at, event);
    }

    /// Events scheduled for exactly `tick`
    pub fn due(&self, tick: Tick) -> Vec<ClientEvent> {
        let start = self.events.partition_point(|e| e.tick < tick);
        self.events
            .range(start..)
            .take_while(|e| e.tick == tick)
            .copied()
            .collect()
    }

    /// Events of one client with `after < tick <= through`
    pub fn from_client(&self, client: ClientId, after: Tick, through: Tick) -> Vec<ClientEvent> {
        let start = self.events.partition_point(|e| e.tick <= after);
        self.events
            .range(start..)
            .take_while(|e| e.tick <= through)
            .filter(|e| e.client == client)
            .copied()
            .collect()
    }

    /// Drop every event with a tick below `tick`
    pub fn prune_before(&mut self, tick: Tick) {
        while self.events.front().is_some_and(|e| e.tick < tick) {
            self.events.pop_front();
        }
    }

    /// Drop one client's events scheduled after `tick`
    pub fn discard_after(&mut self, client: ClientId, tick: Tick) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.client != client || e.tick <= tick);
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(tick: Tick, client: ClientId, input: u32) -> ClientEvent {
        ClientEvent::new(tick, client, input)
    }

    #[test]
    fn test_insert_keeps_tick_order() {
        let mut log = EventLog::new();
        log.insert(ev(5, 1, 0));
        log.insert(ev(2, 2, 0));
        log.insert(ev(5, 3, 1));
        log.insert(ev(3, 1, 0));
        let ticks: Vec<_> = log.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3, 5, 5]);
        // same tick keeps arrival order
        assert_eq!(log.due(5), vec![ev(5, 1, 0), ev(5, 3, 1)]);
        assert!(log.due(4).is_empty());
    }

    #[test]
    fn test_from_client_range() {
        let mut log = EventLog::new();
        for t in 1..=6 {
            log.insert(ev(t, 1, t));
            log.insert(ev(t, 2, t));
        }
        let picked = log.from_client(1, 2, 4);
        assert_eq!(picked, vec![ev(3, 1, 3), ev(4, 1, 4)]);
    }

    #[test]
    fn test_prune_and_discard() {
        let mut log = EventLog::new();
        for t in 1..=6 {
            log.insert(ev(t, 1, 0));
            log.insert(ev(t, 2, 0));
        }
        log.prune_before(3);
        assert_eq!(log.len(), 8);
        assert_eq!(log.discard_after(2, 4), 2);
        assert_eq!(log.len(), 6);
        assert!(log.due(6).iter().all(|e| e.client == 1));
    }
}
