//! Headless Match Example
//!
//! Runs several peers in one process over a lossy, reordering in-memory
//! network. Peers join one after another, drive scripted bots, and at the
//! end the run reports how many ticks every pair of peers agreed on. With
//! `record` set, the host's view is saved as a replay, reloaded and played
//! back to the same final state.
//!
//! ```text
//! cargo run -p headless_match -- demos/headless_match/config/match.ron
//! LOG_FORMAT=json RUST_LOG=debug cargo run -p headless_match
//! ```

use meshfire_core::input::{Input, BTN_FIRE, BTN_JUMP, BTN_MOVE, BTN_RUN, BTN_SPAWN};
use meshfire_core::{ClientId, Fingerprint, GameRng, GameTuning, RoomConfig, Tick};
use meshfire_journal::{Exporter, Replay, ReplayPlayer, ReplayRecorder};
use meshfire_netcode::{
    LoopbackEndpoint, LoopbackNetwork, Session, SessionConfig, SessionEvent,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct MatchConfig {
    peers: u32,
    frames: u32,
    /// Frames between two peers joining
    join_interval: u32,
    loss_percent: u32,
    /// Longest delivery delay, in frames
    max_delay: u32,
    record: Option<String>,
    room: RoomConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        let mut room = RoomConfig::default();
        room.debug_checks = true;
        Self {
            peers: 3,
            frames: 1200,
            join_interval: 90,
            loss_percent: 5,
            max_delay: 3,
            record: None,
            room,
        }
    }
}

impl MatchConfig {
    fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let mut config: MatchConfig = ron::from_str(&text)?;
        config.room.normalize();
        config.peers = config.peers.clamp(1, 16);
        Ok(config)
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// A scripted player: wanders, sometimes runs, jumps or shoots
struct Bot {
    rng: GameRng,
    input: Input,
}

impl Bot {
    fn new(id: ClientId) -> Self {
        Self {
            rng: GameRng::new(0x9e37_79b9 ^ id as u32),
            input: Input::NONE.with(BTN_SPAWN | BTN_MOVE),
        }
    }

    fn think(&mut self) -> u32 {
        if self.rng.percent(5) {
            self.input = self.input.with_move(self.rng.byte());
        }
        if self.rng.percent(3) {
            self.input = self.input.with_aim(self.rng.byte());
        }
        for (button, chance) in [(BTN_RUN, 2), (BTN_JUMP, 1), (BTN_FIRE, 4)] {
            if self.rng.percent(chance) {
                self.input = if self.input.held(button) {
                    self.input.without(button)
                } else {
                    self.input.with(button)
                };
            }
        }
        self.input.raw()
    }
}

struct Peer {
    session: Session<LoopbackEndpoint>,
    bot: Bot,
    seen: BTreeMap<Tick, Fingerprint>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading match config");
            MatchConfig::load(&path)?
        }
        None => MatchConfig::default(),
    };
    let room = config.room.clone();
    let tuning = GameTuning::default();
    let session_config = SessionConfig::from_room(&room);
    let tick_ms = session_config.tick_ms;

    info!(
        peers = config.peers,
        frames = config.frames,
        loss = config.loss_percent,
        "starting headless match"
    );

    let net = LoopbackNetwork::with_conditions(room.seed, config.loss_percent, config.max_delay);
    let host = Session::host(
        1,
        room.clone(),
        tuning.clone(),
        session_config.clone(),
        net.endpoint(1),
        (),
    )?;

    let mut recorder = ReplayRecorder::new(room.clone(), tuning.clone());
    recorder.set_name(1, "bot-1");
    if let Some(state) = host.state() {
        recorder.start(state);
    }

    let mut peers = vec![Peer {
        session: host,
        bot: Bot::new(1),
        seen: BTreeMap::new(),
    }];
    let mut next_id: ClientId = 2;
    let mut now = 0.0;

    for frame in 1..=config.frames {
        now += tick_ms;

        if (next_id as u32) <= config.peers && frame % config.join_interval.max(1) == 0 {
            let id = next_id;
            next_id += 1;
            let mut session = Session::join(
                id,
                room.clone(),
                tuning.clone(),
                session_config.clone(),
                net.endpoint(id),
                (),
            )?;
            for peer in &mut peers {
                peer.session.add_peer(id, now);
                session.add_peer(peer.session.local_id(), now);
            }
            recorder.set_name(id, format!("bot-{id}"));
            peers.push(Peer {
                session,
                bot: Bot::new(id),
                seen: BTreeMap::new(),
            });
        }

        for peer in &mut peers {
            let session = &mut peer.session;
            if session.is_closed() {
                continue;
            }
            if let Err(err) = session.poll(now) {
                error!(peer = session.local_id(), %err, "receive failed");
            } else {
                if session.is_playing() {
                    session.set_input(peer.bot.think());
                }
                match session.update(now) {
                    Ok(_) => {
                        // rendering would happen here
                        session.predict(now, |ctx, _| ctx.state.players.len());
                        if let Some(state) = session.state() {
                            peer.seen.insert(state.tick, state.fingerprint());
                        }
                    }
                    Err(err) => error!(peer = session.local_id(), %err, "update failed"),
                }
            }
            for event in session.take_events() {
                match event {
                    SessionEvent::Desync { peer: other, tick } => {
                        error!(peer = session.local_id(), other, tick, "desync");
                    }
                    SessionEvent::PeerLost(other) | SessionEvent::ConnectFailed(other) => {
                        warn!(peer = session.local_id(), other, "peer gone");
                    }
                    other => info!(peer = session.local_id(), ?other, "session event"),
                }
            }
        }

        let host = &mut peers[0].session;
        let applied = host.take_applied();
        if let Some(state) = host.state() {
            recorder.record(state, &applied);
        }
        net.advance();
    }

    report(&peers, &net);

    if let Some(path) = &config.record {
        verify_replay(recorder, path, &peers[0].session)?;
    }
    Ok(())
}

fn report(peers: &[Peer], net: &LoopbackNetwork) {
    for peer in peers {
        let session = &peer.session;
        let players = session.state().map_or(0, |s| s.players.len());
        info!(
            peer = session.local_id(),
            tick = session.tick(),
            players,
            playing = session.is_playing(),
            checked = session.fingerprints_checked(),
            "final"
        );
    }

    let mut agreed = 0usize;
    let mut disagreed: HashMap<Tick, usize> = HashMap::new();
    for (i, a) in peers.iter().enumerate() {
        for b in &peers[i + 1..] {
            for (tick, fp) in &a.seen {
                match b.seen.get(tick) {
                    Some(other) if other == fp => agreed += 1,
                    Some(_) => *disagreed.entry(*tick).or_default() += 1,
                    None => {}
                }
            }
        }
    }
    let stats = net.stats();
    info!(
        agreed,
        disagreed = disagreed.len(),
        sent = stats.sent,
        dropped = stats.dropped,
        "fingerprint comparison"
    );
    if let Some(first) = disagreed.keys().min() {
        error!(tick = first, "peers diverged");
    }
}

fn verify_replay(
    recorder: ReplayRecorder,
    path: &str,
    host: &Session<LoopbackEndpoint>,
) -> Result<(), Box<dyn std::error::Error>> {
    let replay = recorder.finish()?;
    replay.save(path)?;
    info!(%path, events = replay.events.len(), "replay saved");

    let replay = Replay::load(path)?;
    println!("{}", Exporter::new(&replay).to_text());

    let mut player = ReplayPlayer::new(replay)?;
    while player.step_forward() {}
    match host.state() {
        Some(state) if state == player.state() => {
            info!(tick = player.tick(), "replay reproduces the host state");
        }
        _ => error!(tick = player.tick(), "replay diverged from the host"),
    }
    Ok(())
}
