//! Delta-encoded event streams
//!
//! Events are sorted by tick. The first tick travels separately (in the
//! packet header or at the head of a replay stream); after it each event is
//! written as `delta_to_next + 1` followed by its payload, where
//! `delta_to_next` is the tick gap to the following event (0 for the last).
//! A zero word terminates the stream, which is why deltas are offset by one.
//!
//! ```text
//! first = 10
//! [{10,5},{10,5},{13,9}]  ->  1 5 | 4 5 | 1 9 | 0
//! ```

use crate::error::Result;
use crate::words::{WordReader, WordWriter};
use meshfire_core::{ClientEvent, ClientId, Tick};

/// Tick of the first event, or 0 for an empty list
pub fn first_tick(events: &[ClientEvent]) -> Tick {
    events.first().map_or(0, |e| e.tick)
}

/// Gap from each event to the next one (0 for the last)
pub fn tick_deltas(events: &[ClientEvent]) -> Vec<Tick> {
    debug_assert!(
        events.windows(2).all(|p| p[0].tick <= p[1].tick),
        "event stream must be sorted by tick"
    );
    events
        .iter()
        .enumerate()
        .map(|(i, e)| events.get(i + 1).map_or(0, |next| next.tick - e.tick))
        .collect()
}

/// Write single-client events; the client id is implied by the sender
pub fn encode_events(w: &mut WordWriter, events: &[ClientEvent]) {
    for (e, delta) in events.iter().zip(tick_deltas(events)) {
        w.push(delta + 1);
        w.push(e.input);
    }
    w.push(0);
}

/// Read single-client events, attributing them to `client`
pub fn decode_events(
    r: &mut WordReader<'_>,
    first: Tick,
    client: ClientId,
) -> Result<Vec<ClientEvent>> {
    let mut events = Vec::new();
    let mut tick = first;
    loop {
        let step = r.next()?;
        if step == 0 {
            return Ok(events);
        }
        let input = r.next()?;
        events.push(ClientEvent::new(tick, client, input));
        tick = tick.wrapping_add(step - 1);
    }
}

/// Write a multi-client stream: first tick, then `(delta + 1, client, input)`
///
/// Used for replays, where every event of the session is stored in the
/// order it was applied.
pub fn encode_event_log(w: &mut WordWriter, events: &[ClientEvent]) {
    w.push(first_tick(events));
    for (e, delta) in events.iter().zip(tick_deltas(events)) {
        w.push(delta + 1);
        w.push_i32(e.client);
        w.push(e.input);
    }
    w.push(0);
}

/// Read a stream written by [`encode_event_log`]
pub fn decode_event_log(r: &mut WordReader<'_>) -> Result<Vec<ClientEvent>> {
    let mut events = Vec::new();
    let mut tick = r.next()?;
    loop {
        let step = r.next()?;
        if step == 0 {
            return Ok(events);
        }
        let client = r.next_i32()?;
        let input = r.next()?;
        events.push(ClientEvent::new(tick, client, input));
        tick = tick.wrapping_add(step - 1);
    }
}
