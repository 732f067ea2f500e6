//! Input and acknowledgement protocol
//!
//! Every peer advertises a tick through which it has sent all of its inputs:
//! `state.tick + input_delay - 1`. Local inputs are scheduled after that
//! point, so an advertised tick is a promise that no more events for it
//! will follow. A peer can simulate tick `t` once every ready peer has
//! advertised at least `t` (the horizon).
//!
//! Each packet carries the sender's events newer than what the destination
//! acknowledged and not newer than the packet's tick. Since acknowledgements
//! only move forward, any single packet with a higher tick completes the
//! receiver's view of the sender up to that tick; duplicates and reordering
//! are harmless.
//!
//! ```text
//! peer A                                   peer B
//!   tick 40, adv 47  ── events (B.ack, 47] ──▶  A.tick = 47
//!                    ◀── ack 47, adv 45 ────   B acknowledged 47
//! ```

use crate::client::Client;
use crate::event_log::EventLog;
use indexmap::IndexMap;
use meshfire_codec::Packet;
use meshfire_core::{ClientEvent, ClientId, RoomConfig, Tick};
use tracing::{debug, info, trace};

/// Ticks events are kept after every peer has consumed them, so a joiner
/// that adopts a slightly older snapshot from another peer still gets them
pub const PRUNE_MARGIN: Tick = 128;

/// Protocol state of the local peer
#[derive(Debug, Clone)]
pub struct Protocol {
    local: ClientId,
    input_delay: Tick,
    tick_ms: f64,
    clients: IndexMap<ClientId, Client>,
    log: EventLog,
    /// Highest tick advertised so far
    advertised: Tick,
    /// First tick advertised while holding a state
    ready_tick: Option<Tick>,
    playing: bool,
    last_input: u32,
    last_event_tick: Tick,
}

impl Protocol {
    pub fn new(local: ClientId, room: &RoomConfig) -> Self {
        Self::with_timing(local, room.input_delay(), room.tick_ms())
    }

    pub fn with_timing(local: ClientId, input_delay: Tick, tick_ms: f64) -> Self {
        Self {
            local,
            input_delay: input_delay.max(1),
            tick_ms,
            clients: IndexMap::new(),
            log: EventLog::new(),
            advertised: 0,
            ready_tick: None,
            playing: false,
            last_input: 0,
            last_event_tick: 0,
        }
    }

    pub fn local(&self) -> ClientId {
        self.local
    }

    pub fn input_delay(&self) -> Tick {
        self.input_delay
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    /// Record for a peer, created on first contact
    pub fn add_client(&mut self, id: ClientId, now_ms: f64) -> &mut Client {
        self.clients.entry(id).or_insert_with(|| {
            info!(peer = id, "peer added");
            Client::new(id, now_ms)
        })
    }

    /// Forget a peer
    ///
    /// Events it advertised are kept (other peers may already have applied
    /// them); anything scheduled beyond its last advertised tick is dropped.
    pub fn remove_client(&mut self, id: ClientId) -> Option<Client> {
        let client = self.clients.shift_remove(&id)?;
        let dropped = self.log.discard_after(id, client.tick);
        info!(peer = id, tick = client.tick, dropped, "peer removed");
        Some(client)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn is_ready(&self) -> bool {
        self.ready_tick.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Promise covering ticks through `state_tick + input_delay - 1`
    pub fn advertise(&mut self, state_tick: Tick) -> Tick {
        self.advertised = self
            .advertised
            .max(state_tick + self.input_delay.saturating_sub(1));
        self.advertised
    }

    /// The local peer now holds a state at `state_tick`
    pub fn set_ready(&mut self, state_tick: Tick) {
        if self.ready_tick.is_none() {
            let tick = self.advertise(state_tick);
            self.ready_tick = Some(tick);
            self.last_event_tick = self.last_event_tick.max(state_tick);
            debug!(tick, "ready");
        }
    }

    /// Start playing without a barrier (the peer that opens the room)
    pub fn start_playing(&mut self, state_tick: Tick) {
        self.set_ready(state_tick);
        self.playing = true;
    }

    /// Largest one-way latency to any peer, in ticks
    pub fn jitter_ticks(&self) -> Tick {
        self.clients
            .values()
            .map(|c| c.jitter_ticks(self.tick_ms))
            .max()
            .unwrap_or(0)
    }

    /// Schedule a changed local input
    ///
    /// The event lands at `state_tick + max(input_delay, jitter)` and never
    /// before an earlier local event, so later inputs always win.
    pub fn schedule_input(&mut self, state_tick: Tick, input: u32) -> Option<ClientEvent> {
        if !self.playing || input == self.last_input {
            return None;
        }
        let delay = self.input_delay.max(self.jitter_ticks());
        let tick = (state_tick + delay)
            .max(self.last_event_tick)
            .max(self.advertised + 1);
        let event = ClientEvent::new(tick, self.local, input);
        self.log.insert(event);
        self.last_input = input;
        self.last_event_tick = tick;
        trace!(tick, input, "input scheduled");
        Some(event)
    }

    /// Check the join barrier and start playing when it is crossed
    ///
    /// Every known peer must have been heard from. Every playing peer must
    /// be ready and must have acknowledged one of our ready packets, so it
    /// counts us in its horizon. Our own promise must also reach what each
    /// of them advertised; from then on no peer can have simulated a tick
    /// our first input lands on.
    pub fn try_join(&mut self, state_tick: Tick) -> bool {
        if self.playing {
            return true;
        }
        let Some(ready_tick) = self.ready_tick else {
            return false;
        };
        let advertised = self.advertise(state_tick);
        let clear = self.clients.values().all(|c| {
            c.heard
                && (!c.is_playing
                    || (c.ready && c.acknowledged_tick >= ready_tick && advertised >= c.tick))
        });
        if clear {
            self.playing = true;
            info!(tick = state_tick, "joined");
        }
        clear
    }

    /// Highest tick every ready peer has supplied inputs through
    ///
    /// `None` when no peer is ready, in which case pacing is purely local.
    /// Until the local peer plays, a peer it has not heard from yet may be
    /// playing too and holds the horizon at its (unknown) tick.
    pub fn horizon(&self) -> Option<Tick> {
        self.clients
            .values()
            .filter(|c| c.ready || (!self.playing && !c.heard))
            .map(|c| c.tick)
            .min()
    }

    /// Events to apply when simulating `tick`
    pub fn due(&self, tick: Tick) -> Vec<ClientEvent> {
        self.log.due(tick)
    }

    /// Drop events that are simulated and acknowledged everywhere, keeping
    /// [`PRUNE_MARGIN`] ticks of slack
    pub fn prune(&mut self, state_tick: Tick) {
        let acked = self.clients.values().map(|c| c.acknowledged_tick).min();
        let peer_tick = self
            .clients
            .values()
            .filter(|c| c.ready)
            .map(|c| c.tick)
            .min();
        let bound = [Some(state_tick), acked, peer_tick]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(state_tick);
        if let Some(before) = (bound + 1).checked_sub(PRUNE_MARGIN) {
            self.log.prune_before(before);
        }
    }

    /// Header and events of the next packet to `peer`
    ///
    /// `state_tick` is `None` while the local peer has no state yet.
    pub fn build_packet(&mut self, peer: ClientId, state_tick: Option<Tick>, now_ms: f64) -> Packet {
        let tick = match state_tick {
            Some(t) => self.advertise(t),
            None => 0,
        };
        let (ack_tick, ts1, after) = self
            .clients
            .get(&peer)
            .map_or((0, 0, 0), |c| (c.tick, c.last_ts0, c.acknowledged_tick));
        Packet {
            tick,
            playing: self.playing,
            sync: self.is_ready(),
            ack_tick,
            ts0: now_ms as u32,
            ts1,
            events: self.log.from_client(self.local, after, tick),
            state: None,
            debug: None,
        }
    }

    /// Merge a packet from `source` into the peer record and event log
    pub fn receive(&mut self, source: ClientId, packet: &Packet, now_ms: f64) {
        let client = self.clients.entry(source).or_insert_with(|| {
            info!(peer = source, "peer added");
            Client::new(source, now_ms)
        });
        client.heard = true;
        client.ever_connected = true;
        client.acknowledge(packet.ack_tick);
        if packet.ts1 != 0 {
            client.observe_rtt((now_ms as u32).wrapping_sub(packet.ts1) as f64);
        }
        client.last_ts0 = packet.ts0;
        if packet.sync && !client.ready {
            client.ready = true;
            info!(peer = source, tick = packet.tick, "peer ready");
        }
        if packet.playing && !client.is_playing {
            client.is_playing = true;
            info!(peer = source, "peer playing");
        }

        let known = client.tick;
        if packet.tick > known {
            client.tick = packet.tick;
            for event in packet.events.iter().filter(|e| e.tick > known) {
                self.log.insert(*event);
            }
        }
    }
}
