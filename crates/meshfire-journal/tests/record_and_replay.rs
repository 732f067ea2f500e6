//! A recorded networked session replays to the same state

use meshfire_core::input::{Input, BTN_FIRE, BTN_MOVE, BTN_SPAWN};
use meshfire_core::{GameTuning, RoomConfig};
use meshfire_journal::{Replay, ReplayPlayer, ReplayRecorder};
use meshfire_netcode::{LoopbackNetwork, Session, SessionConfig};

fn input(id: i32, frame: u32) -> u32 {
    let mut input = Input::NONE
        .with(BTN_SPAWN | BTN_MOVE)
        .with_move(((frame / 20) * 50 + id as u32 * 31) as u8)
        .with_aim((frame * 3) as u8);
    if (frame / 10) % 3 == 0 {
        input = input.with(BTN_FIRE);
    }
    input.raw()
}

#[test]
fn test_recorded_session_replays_identically() {
    let mut room = RoomConfig::default();
    room.set_input_delay(3);
    let tuning = GameTuning::default();
    let config = SessionConfig::from_room(&room);
    let tick_ms = config.tick_ms;

    let net = LoopbackNetwork::with_conditions(5, 10, 2);
    let mut host = Session::host(
        1,
        room.clone(),
        tuning.clone(),
        config.clone(),
        net.endpoint(1),
        (),
    )
    .unwrap();
    let mut guest =
        Session::join(2, room.clone(), tuning.clone(), config, net.endpoint(2), ()).unwrap();
    host.add_peer(2, 0.0);
    guest.add_peer(1, 0.0);

    let mut recorder = ReplayRecorder::new(room, tuning);
    recorder.set_name(1, "host");
    recorder.set_name(2, "guest");
    recorder.start(host.state().unwrap());

    let mut now = 0.0;
    for frame in 1..=400 {
        now += tick_ms;
        for peer in [&mut host, &mut guest] {
            peer.poll(now).unwrap();
            peer.set_input(input(peer.local_id(), frame));
            peer.update(now).unwrap();
        }
        let applied = host.take_applied();
        recorder.record(host.state().unwrap(), &applied);
        net.advance();
    }
    assert!(guest.is_playing());
    assert!(recorder.event_count() > 10);

    let path = std::env::temp_dir().join(format!("meshfire-replay-{}.mfr", std::process::id()));
    recorder.finish().unwrap().save(&path).unwrap();
    let replay = Replay::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(replay.metadata.names[&2], "guest");
    assert_eq!(replay.last_tick(), host.tick().unwrap());

    let mut player = ReplayPlayer::new(replay).unwrap();
    player.goto(player.replay().last_tick()).unwrap();
    assert!(player.finished());
    assert_eq!(player.state(), host.state().unwrap());
}
