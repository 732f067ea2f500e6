//! Multi-peer lockstep over a lossy, reordering loopback network

use meshfire_core::input::{Input, BTN_MOVE, BTN_SPAWN};
use meshfire_core::{ClientId, Fingerprint, GameTuning, RoomConfig, Tick};
use meshfire_netcode::{LoopbackEndpoint, LoopbackNetwork, Session, SessionConfig, SessionEvent};
use std::collections::BTreeMap;

fn quiet_room() -> RoomConfig {
    let mut room = RoomConfig::default();
    room.set_npc_cap(0);
    room.set_input_delay(4);
    room.debug_checks = true;
    room
}

fn host(net: &LoopbackNetwork, id: ClientId) -> Session<LoopbackEndpoint> {
    let room = quiet_room();
    let config = SessionConfig::from_room(&room);
    Session::host(id, room, GameTuning::default(), config, net.endpoint(id), ()).unwrap()
}

/// Peers on one lossy, reordering network, stepped one frame at a time
struct Mesh {
    net: LoopbackNetwork,
    peers: Vec<Session<LoopbackEndpoint>>,
    now: f64,
    frame: u32,
    seen: Vec<BTreeMap<Tick, Fingerprint>>,
}

impl Mesh {
    fn new(loss_percent: u32) -> Self {
        let net = LoopbackNetwork::with_conditions(77, loss_percent, 3);
        let peers = vec![host(&net, 1)];
        Self {
            net,
            peers,
            now: 0.0,
            frame: 0,
            seen: vec![Default::default()],
        }
    }

    fn join(&mut self, id: ClientId) {
        let room = quiet_room();
        let config = SessionConfig::from_room(&room);
        let mut joiner = Session::join(
            id,
            room,
            GameTuning::default(),
            config,
            self.net.endpoint(id),
            (),
        )
        .unwrap();
        for peer in &mut self.peers {
            peer.add_peer(id, self.now);
            joiner.add_peer(peer.local_id(), self.now);
        }
        self.peers.push(joiner);
        self.seen.push(Default::default());
    }

    fn input(id: ClientId, frame: u32) -> u32 {
        let angle = ((frame / 30) * 40 + id as u32 * 17) as u8;
        Input::NONE
            .with(BTN_SPAWN | BTN_MOVE)
            .with_move(angle)
            .raw()
    }

    fn run(&mut self, frames: u32) {
        for _ in 0..frames {
            self.frame += 1;
            self.now += self.peers[0].config().tick_ms;
            for (peer, seen) in self.peers.iter_mut().zip(&mut self.seen) {
                peer.poll(self.now).unwrap();
                peer.set_input(Self::input(peer.local_id(), self.frame));
                peer.update(self.now).unwrap();
                if let Some(state) = peer.state() {
                    seen.insert(state.tick, state.fingerprint());
                }
            }
            self.net.advance();
        }
    }
}

#[test]
fn test_lossy_mesh_with_late_joiners_stays_in_lockstep() {
    let mut mesh = Mesh::new(20);
    mesh.run(60);
    mesh.join(2);
    mesh.run(60);
    mesh.join(3);
    mesh.run(600);

    for peer in &mut mesh.peers {
        assert!(peer.is_playing(), "peer {} never joined", peer.local_id());
        assert!(!peer.is_closed());
        assert!(peer.fingerprints_checked() > 0);
    }
    let joined: Vec<_> = mesh.peers[2].take_events();
    assert!(joined.iter().any(|e| matches!(e, SessionEvent::SnapshotAdopted { .. })));
    assert!(joined.iter().any(|e| matches!(e, SessionEvent::Joined { .. })));

    // every tick two peers both sampled must agree
    let mut common = 0;
    for (tick, fp) in &mesh.seen[0] {
        for other in &mesh.seen[1..] {
            if let Some(theirs) = other.get(tick) {
                assert_eq!(fp, theirs, "divergence at tick {tick}");
                common += 1;
            }
        }
    }
    assert!(common > 100);

    let oldest = mesh.peers.iter().filter_map(|p| p.tick()).min().unwrap();
    assert!(oldest > 400);
    for peer in &mesh.peers {
        assert_eq!(peer.state().unwrap().players.len(), 3);
    }
}

#[test]
fn test_lost_peer_is_dropped_and_room_resumes() {
    let mut mesh = Mesh::new(0);
    mesh.run(30);
    mesh.join(2);
    mesh.run(120);
    assert!(mesh.peers[1].is_playing());

    mesh.net.set_connected(2, false);
    let before = mesh.peers[0].tick().unwrap();
    mesh.run(400);

    let events = mesh.peers[0].take_events();
    assert!(events.contains(&SessionEvent::PeerLost(2)));
    assert!(mesh.peers[0].clients().next().is_none());
    assert!(mesh.peers[0].tick().unwrap() > before + 30);
    assert!(mesh.peers[1].take_events().contains(&SessionEvent::PeerLost(1)));
}
