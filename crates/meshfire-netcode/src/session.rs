//! The per-peer session
//!
//! [`Session`] ties the pieces together and is the only owner of the
//! authoritative [`SimulationContext`]. It is driven from outside by two
//! calls per frame, in any order:
//!
//! - [`on_packet`](Session::on_packet) (or [`poll`](Session::poll)) for every
//!   inbound datagram
//! - [`update`](Session::update) to run due ticks and send packets
//!
//! plus [`predict`](Session::predict) when rendering.

use crate::config::SessionConfig;
use crate::desync::DesyncDetector;
use crate::error::{Error, Result};
use crate::prediction::{predict, Cosmetics};
use crate::protocol::Protocol;
use crate::scheduler::TickScheduler;
use crate::transport::{PeerId, Transport};
use crate::Client;
use meshfire_codec::Packet;
use meshfire_core::{
    ClientEvent, ClientId, GameTuning, RoomConfig, SimulationContext, StateData, Tick,
};
use tracing::{debug, error, info, warn};

/// Something the embedding application should know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A peer reported that it holds a state
    PeerReady(PeerId),
    /// A snapshot from `from` became the local state
    SnapshotAdopted { from: PeerId, tick: Tick },
    /// The local peer crossed the join barrier
    Joined { tick: Tick },
    /// A peer stayed disconnected too long and was dropped
    PeerLost(PeerId),
    /// A new peer never came up
    ConnectFailed(PeerId),
    /// Fingerprints disagreed; the session is closed
    Desync { peer: PeerId, tick: Tick },
}

/// One peer's view of a lockstep room
pub struct Session<T: Transport, C: Cosmetics = ()> {
    config: SessionConfig,
    room: RoomConfig,
    tuning: GameTuning,
    transport: T,
    cosmetics: C,
    protocol: Protocol,
    scheduler: TickScheduler,
    desync: DesyncDetector,
    ctx: Option<SimulationContext>,
    applied: Vec<ClientEvent>,
    events: Vec<SessionEvent>,
    closed: Option<Tick>,
}

impl<T: Transport, C: Cosmetics> Session<T, C> {
    fn with_parts(
        local: ClientId,
        room: RoomConfig,
        tuning: GameTuning,
        config: SessionConfig,
        transport: T,
        cosmetics: C,
    ) -> Self {
        Self {
            protocol: Protocol::with_timing(local, config.input_delay, config.tick_ms),
            scheduler: TickScheduler::new(
                config.tick_ms,
                config.target_lead(),
                config.drift_gain,
                config.max_catch_up,
            ),
            desync: DesyncDetector::new(config.history_ticks, config.echo_state),
            config,
            room,
            tuning,
            transport,
            cosmetics,
            ctx: None,
            applied: Vec::new(),
            events: Vec::new(),
            closed: None,
        }
    }

    /// Open a new room; the local peer plays from tick 0
    pub fn host(
        local: ClientId,
        room: RoomConfig,
        tuning: GameTuning,
        config: SessionConfig,
        transport: T,
        cosmetics: C,
    ) -> Result<Self> {
        let ctx = SimulationContext::new(&room, tuning.clone())?;
        let mut session = Self::with_parts(local, room, tuning, config, transport, cosmetics);
        session.protocol.start_playing(ctx.state.tick);
        if session.config.debug_checks {
            session.desync.record(&ctx.state)?;
        }
        info!(local, seed = ctx.state.seed, "room opened");
        session.ctx = Some(ctx);
        Ok(session)
    }

    /// Join an existing room; the state arrives as a snapshot from a peer
    pub fn join(
        local: ClientId,
        room: RoomConfig,
        tuning: GameTuning,
        config: SessionConfig,
        transport: T,
        cosmetics: C,
    ) -> Result<Self> {
        tuning.validate()?;
        info!(local, "joining room");
        Ok(Self::with_parts(local, room, tuning, config, transport, cosmetics))
    }

    pub fn local_id(&self) -> ClientId {
        self.protocol.local()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn room(&self) -> &RoomConfig {
        &self.room
    }

    /// Authoritative state, once the local peer holds one
    pub fn state(&self) -> Option<&StateData> {
        self.ctx.as_ref().map(|c| &c.state)
    }

    pub fn context(&self) -> Option<&SimulationContext> {
        self.ctx.as_ref()
    }

    pub fn tick(&self) -> Option<Tick> {
        self.state().map(|s| s.tick)
    }

    pub fn is_ready(&self) -> bool {
        self.protocol.is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.protocol.is_playing()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.protocol.clients()
    }

    pub fn horizon(&self) -> Option<Tick> {
        self.protocol.horizon()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cosmetics(&self) -> &C {
        &self.cosmetics
    }

    /// Remote fingerprints compared so far
    pub fn fingerprints_checked(&self) -> u64 {
        self.desync.checked()
    }

    /// Drain notifications since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drain the events applied by authoritative ticks, in order
    pub fn take_applied(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.applied)
    }

    /// Start talking to a peer
    pub fn add_peer(&mut self, peer: PeerId, now_ms: f64) {
        if peer != self.local_id() {
            self.protocol.add_client(peer, now_ms);
        }
    }

    /// Forget a peer that disconnected
    pub fn remove_peer(&mut self, peer: PeerId) -> Option<Client> {
        self.protocol.remove_client(peer)
    }

    /// Set the local input; changes are scheduled for a future tick
    ///
    /// Ignored until the join barrier is crossed.
    pub fn set_input(&mut self, input: u32) -> Option<ClientEvent> {
        let tick = self.tick()?;
        self.protocol.schedule_input(tick, input)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.closed {
            Some(tick) => Err(Error::Closed(tick)),
            None => Ok(()),
        }
    }

    /// Close the session on a fatal error
    fn fail(&mut self, err: Error) -> Error {
        if let Error::Desync { tick, peer, .. } = &err {
            error!(peer, tick, "state out of sync, closing session");
            self.closed = Some(*tick);
            self.events.push(SessionEvent::Desync {
                peer: *peer,
                tick: *tick,
            });
        }
        err
    }

    /// Handle one datagram from `source`
    pub fn on_packet(&mut self, source: PeerId, bytes: &[u8], now_ms: f64) -> Result<()> {
        self.ensure_open()?;
        if source == self.local_id() {
            return Ok(());
        }
        let packet = Packet::decode(bytes, source)?;
        let was_ready = self.protocol.client(source).is_some_and(|c| c.ready);
        self.protocol.receive(source, &packet, now_ms);
        if !was_ready && packet.sync {
            self.events.push(SessionEvent::PeerReady(source));
        }

        if self.ctx.is_none() {
            if let Some(state) = packet.state {
                self.adopt(source, state, now_ms)?;
            }
        }
        if let (Some(block), true) = (packet.debug, self.config.debug_checks) {
            if self.ctx.is_some() {
                if let Err(err) = self.desync.check(source, block) {
                    return Err(self.fail(err));
                }
            }
        }
        Ok(())
    }

    /// Take a peer's snapshot as the local state
    fn adopt(&mut self, source: PeerId, state: StateData, now_ms: f64) -> Result<()> {
        let tick = state.tick;
        if self.config.debug_checks {
            self.desync.record(&state)?;
        }
        let ctx = SimulationContext::from_state(state, &self.room, self.tuning.clone())?;
        self.ctx = Some(ctx);
        self.protocol.set_ready(tick);
        self.scheduler.reset(now_ms);
        info!(peer = source, tick, "snapshot adopted");
        self.events.push(SessionEvent::SnapshotAdopted { from: source, tick });
        Ok(())
    }

    /// Drain the transport into [`on_packet`](Self::on_packet)
    ///
    /// Malformed datagrams are logged and skipped. Returns the number of
    /// datagrams handled.
    pub fn poll(&mut self, now_ms: f64) -> Result<usize> {
        let mut handled = 0;
        loop {
            let received = self
                .transport
                .recv()
                .map_err(|e| Error::Transport(e.to_string()))?;
            let Some((source, bytes)) = received else {
                return Ok(handled);
            };
            match self.on_packet(source, &bytes, now_ms) {
                Ok(()) => handled += 1,
                Err(Error::Codec(err)) => warn!(peer = source, %err, "dropping malformed packet"),
                Err(err) => return Err(err),
            }
        }
    }

    /// Run the ticks the clock and the horizon allow, then send packets
    ///
    /// Returns the number of ticks simulated.
    pub fn update(&mut self, now_ms: f64) -> Result<u32> {
        self.ensure_open()?;
        self.check_links(now_ms);

        let mut ran = 0;
        let mut fatal = None;
        if let Some(ctx) = self.ctx.as_mut() {
            if !self.protocol.is_playing() && self.protocol.try_join(ctx.state.tick) {
                self.events.push(SessionEvent::Joined {
                    tick: ctx.state.tick,
                });
            }

            let horizon = self.protocol.horizon();
            let budget = self.scheduler.budget(now_ms);
            while ran < budget {
                let next = ctx.state.tick + 1;
                if horizon.is_some_and(|h| next > h) {
                    break;
                }
                let due = self.protocol.due(next);
                ctx.step(&due);
                self.cosmetics.apply(&ctx.effects, &ctx.state);
                self.applied.extend(due);
                self.scheduler.consume();
                ran += 1;
                if self.config.debug_checks {
                    if let Err(err) = self.desync.record(&ctx.state) {
                        fatal = Some(err);
                        break;
                    }
                }
                self.protocol.prune(ctx.state.tick);
            }
            self.scheduler.correct_drift(ctx.state.tick, horizon);
        }
        if let Some(err) = fatal {
            return Err(self.fail(err));
        }

        self.send_packets(now_ms);
        Ok(ran)
    }

    /// Render a few speculative ticks past the authoritative state
    ///
    /// Runs at most `prediction_ticks` ticks, and only as many as the clock
    /// says are overdue. Before the join barrier the authoritative state is
    /// rendered as is. Returns `None` while there is no state.
    pub fn predict<R>(
        &mut self,
        now_ms: f64,
        render: impl FnOnce(&SimulationContext, &C) -> R,
    ) -> Option<R> {
        let ctx = self.ctx.as_mut()?;
        let ticks = if self.protocol.is_playing() && self.closed.is_none() {
            self.scheduler
                .pending(now_ms)
                .min(self.config.prediction_ticks)
        } else {
            0
        };
        let protocol = &self.protocol;
        Some(predict(
            ctx,
            &mut self.cosmetics,
            ticks,
            |t| protocol.due(t),
            render,
        ))
    }

    /// Time out peers whose transport is down
    ///
    /// A ready peer is lost after `peer_timeout_ticks`; a peer that never
    /// became ready fails to connect after `join_timeout_ms`.
    fn check_links(&mut self, now_ms: f64) {
        let timeout_ms = self.config.peer_timeout_ticks as f64 * self.config.tick_ms;
        let mut lost = Vec::new();
        let mut failed = Vec::new();
        let ids: Vec<PeerId> = self.protocol.clients().map(|c| c.id).collect();
        for id in ids {
            let connected = self.transport.is_connected(id);
            let Some(client) = self.protocol.client_mut(id) else {
                continue;
            };
            if connected {
                client.ever_connected = true;
                client.disconnected_since_ms = None;
            } else if client.ready {
                let since = *client.disconnected_since_ms.get_or_insert(now_ms);
                if now_ms - since >= timeout_ms {
                    lost.push(id);
                }
            } else {
                // still joining: the join window restarts when a link drops
                let since = if client.ever_connected {
                    *client.disconnected_since_ms.get_or_insert(now_ms)
                } else {
                    client.added_at_ms
                };
                if now_ms - since >= self.config.join_timeout_ms {
                    failed.push(id);
                }
            }
        }
        for id in failed {
            warn!(peer = id, "connection failed");
            self.protocol.remove_client(id);
            self.events.push(SessionEvent::ConnectFailed(id));
        }
        for id in lost {
            warn!(peer = id, "peer lost");
            self.protocol.remove_client(id);
            self.events.push(SessionEvent::PeerLost(id));
        }
    }

    /// One packet to every connected peer
    fn send_packets(&mut self, now_ms: f64) {
        let state_tick = self.tick();
        let debug = if self.config.debug_checks {
            self.desync.latest()
        } else {
            None
        };
        let ids: Vec<PeerId> = self.protocol.clients().map(|c| c.id).collect();
        for peer in ids {
            if !self.transport.is_connected(peer) {
                continue;
            }
            let mut packet = self.protocol.build_packet(peer, state_tick, now_ms);
            packet.debug = debug.clone();

            let playing = self.protocol.is_playing();
            if let (Some(ctx), Some(client)) = (&self.ctx, self.protocol.client_mut(peer)) {
                let due = client
                    .snapshot_sent_ms
                    .map_or(true, |t| now_ms - t >= self.config.snapshot_resend_ms);
                if playing && !client.ready && due {
                    client.snapshot_sent_ms = Some(now_ms);
                    packet.state = Some(ctx.state.clone());
                    debug!(peer, tick = ctx.state.tick, "snapshot sent");
                }
            }

            if let Err(err) = self.transport.send(&packet.encode(), peer) {
                warn!(peer, %err, "send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackNetwork;
    use meshfire_core::input::{Input, BTN_SPAWN};

    fn quiet_room() -> RoomConfig {
        let mut room = RoomConfig::default();
        room.set_npc_cap(0);
        room.set_input_delay(4);
        room.debug_checks = true;
        room
    }

    fn host(net: &LoopbackNetwork, id: ClientId) -> Session<crate::LoopbackEndpoint> {
        let room = quiet_room();
        let config = SessionConfig::from_room(&room);
        Session::host(id, room, GameTuning::default(), config, net.endpoint(id), ()).unwrap()
    }

    #[test]
    fn test_alone_paces_by_wall_clock() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let tick_ms = s.config().tick_ms;
        assert_eq!(s.update(0.0).unwrap(), 0);
        assert_eq!(s.update(tick_ms * 3.5).unwrap(), 3);
        assert_eq!(s.tick(), Some(3));
    }

    #[test]
    fn test_local_input_applies_after_delay() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let tick_ms = s.config().tick_ms;
        s.update(0.0).unwrap();
        let event = s.set_input(Input::NONE.with(BTN_SPAWN).raw()).unwrap();
        assert_eq!(event.tick, 4);

        let mut now = 0.0;
        while s.tick() < Some(4) {
            now += tick_ms;
            s.update(now).unwrap();
        }
        assert_eq!(s.state().unwrap().players.len(), 1);
        assert_eq!(s.take_applied(), vec![event]);
    }

    #[test]
    fn test_predict_renders_ahead_and_restores() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let tick_ms = s.config().tick_ms;
        s.update(0.0).unwrap();
        let before = s.state().unwrap().clone();
        let seen = s.predict(tick_ms * 3.5, |ctx, _| ctx.state.tick).unwrap();
        assert_eq!(seen, 3);
        assert_eq!(s.state().unwrap(), &before);
    }

    #[test]
    fn test_garbage_packet_is_an_error_but_not_fatal() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        assert!(matches!(s.on_packet(2, &[1, 2, 3], 0.0), Err(Error::Codec(_))));
        assert!(!s.is_closed());
        s.update(0.0).unwrap();
    }

    #[test]
    fn test_divergent_fingerprint_closes_session() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let mut forged = s.state().unwrap().clone();
        forged.next_id += 1;
        let packet = Packet {
            tick: 3,
            sync: true,
            playing: true,
            debug: Some(meshfire_codec::FingerprintBlock {
                fingerprint: forged.fingerprint(),
                state: None,
            }),
            ..Default::default()
        };
        let err = s.on_packet(2, &packet.encode(), 0.0).unwrap_err();
        assert!(matches!(err, Error::Desync { tick: 0, peer: 2, .. }));
        assert!(s.is_closed());
        assert!(matches!(s.update(1.0), Err(Error::Closed(0))));
        assert!(s
            .take_events()
            .contains(&SessionEvent::Desync { peer: 2, tick: 0 }));
    }

    #[test]
    fn test_silent_peer_times_out() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        s.add_peer(9, 0.0);
        let timeout = s.config().join_timeout_ms;
        s.update(timeout - 1.0).unwrap();
        assert!(s.clients().any(|c| c.id == 9));
        s.update(timeout).unwrap();
        assert!(s.clients().all(|c| c.id != 9));
        assert_eq!(s.take_events(), vec![SessionEvent::ConnectFailed(9)]);
    }

    #[test]
    fn test_dropped_joiner_fails_to_connect_instead_of_lost() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let _joiner = net.endpoint(5);
        s.add_peer(5, 0.0);
        s.update(0.0).unwrap();
        net.set_connected(5, false);

        let peer_timeout = s.config().peer_timeout_ticks as f64 * s.config().tick_ms;
        let join_timeout = s.config().join_timeout_ms;
        s.update(100.0).unwrap();
        s.update(100.0 + peer_timeout).unwrap();
        assert!(s.clients().any(|c| c.id == 5));
        assert!(s.take_events().is_empty());

        s.update(100.0 + join_timeout).unwrap();
        assert!(s.clients().all(|c| c.id != 5));
        assert_eq!(s.take_events(), vec![SessionEvent::ConnectFailed(5)]);
    }

    #[test]
    fn test_ready_peer_is_lost_after_peer_timeout() {
        let net = LoopbackNetwork::new(1);
        let mut s = host(&net, 1);
        let _peer = net.endpoint(5);
        s.add_peer(5, 0.0);
        let ready = Packet {
            tick: 3,
            sync: true,
            playing: true,
            ..Default::default()
        };
        s.on_packet(5, &ready.encode(), 0.0).unwrap();
        assert_eq!(s.take_events(), vec![SessionEvent::PeerReady(5)]);
        net.set_connected(5, false);

        let peer_timeout = s.config().peer_timeout_ticks as f64 * s.config().tick_ms;
        s.update(100.0).unwrap();
        s.update(100.0 + peer_timeout).unwrap();
        assert!(s.clients().all(|c| c.id != 5));
        assert_eq!(s.take_events(), vec![SessionEvent::PeerLost(5)]);
    }
}
