//! Peer-to-peer packets
//!
//! ```text
//! [tick][flags | ack_delta << 4][first event tick][ts0][ts1]
//! events ... 0
//! state snapshot                          (FLAG_STATE)
//! [tick][seed][next_id][digest][has_state] state?   (FLAG_DEBUG)
//! ```
//!
//! `ack_delta` is the signed distance from `tick` to the last tick the
//! sender has received from the destination peer.

use crate::error::{Error, Result};
use crate::events::{decode_events, encode_events, first_tick};
use crate::snapshot::{decode_snapshot, encode_snapshot};
use crate::words::{bytes_to_words, WordReader, WordWriter};
use meshfire_core::{ClientEvent, ClientId, Fingerprint, StateData, Tick};

/// The sender is an active participant
pub const FLAG_PLAYING: u32 = 1;
/// The sender holds a state and is ready to simulate
pub const FLAG_SYNC: u32 = 2;
/// A full snapshot follows the events
pub const FLAG_STATE: u32 = 4;
/// A fingerprint block closes the packet
pub const FLAG_DEBUG: u32 = 8;

const FLAG_BITS: u32 = 4;
const FLAG_MASK: u32 = (1 << FLAG_BITS) - 1;

/// Sender's fingerprint for one of its simulated ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintBlock {
    pub fingerprint: Fingerprint,
    /// Full state echo for field-by-field comparison
    pub state: Option<StateData>,
}

/// One datagram between two peers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Sender's local tick when the packet was built
    pub tick: Tick,
    pub playing: bool,
    pub sync: bool,
    /// Last tick the sender has received from the destination
    pub ack_tick: Tick,
    /// Sender's clock when sending
    pub ts0: u32,
    /// Destination's `ts0` echoed back, for round-trip measurement
    pub ts1: u32,
    /// Sender's own events, sorted by tick
    pub events: Vec<ClientEvent>,
    /// One-time snapshot for a peer that has not synchronized yet
    pub state: Option<StateData>,
    pub debug: Option<FingerprintBlock>,
}

impl Packet {
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.playing {
            flags |= FLAG_PLAYING;
        }
        if self.sync {
            flags |= FLAG_SYNC;
        }
        if self.state.is_some() {
            flags |= FLAG_STATE;
        }
        if self.debug.is_some() {
            flags |= FLAG_DEBUG;
        }
        flags
    }

    pub fn encode_words(&self) -> Vec<u32> {
        let mut w = WordWriter::new();
        let ack_delta = self.ack_tick.wrapping_sub(self.tick) as i32;
        debug_assert!(
            (ack_delta << FLAG_BITS) >> FLAG_BITS == ack_delta,
            "ack delta {ack_delta} out of range"
        );
        w.push(self.tick);
        w.push(self.flags() | ((ack_delta << FLAG_BITS) as u32));
        w.push(first_tick(&self.events));
        w.push(self.ts0);
        w.push(self.ts1);
        encode_events(&mut w, &self.events);
        if let Some(state) = &self.state {
            encode_snapshot(&mut w, state);
        }
        if let Some(debug) = &self.debug {
            let fp = debug.fingerprint;
            w.push(fp.tick);
            w.push(fp.seed);
            w.push(fp.next_id);
            w.push(fp.digest);
            w.push(debug.state.is_some() as u32);
            if let Some(state) = &debug.state {
                encode_snapshot(&mut w, state);
            }
        }
        w.into_words()
    }

    /// Encode as little-endian bytes
    pub fn encode(&self) -> Vec<u8> {
        crate::words::words_to_bytes(&self.encode_words())
    }

    /// Decode words received from `source`, whose id is given to every event
    pub fn decode_words(words: &[u32], source: ClientId) -> Result<Self> {
        let mut r = WordReader::new(words);
        let tick = r.next()?;
        let word = r.next()?;
        let flags = word & FLAG_MASK;
        let ack_delta = (word as i32) >> FLAG_BITS;
        let first = r.next()?;
        let ts0 = r.next()?;
        let ts1 = r.next()?;
        let events = decode_events(&mut r, first, source)?;

        let state = if flags & FLAG_STATE != 0 {
            Some(decode_snapshot(&mut r)?)
        } else {
            None
        };
        let debug = if flags & FLAG_DEBUG != 0 {
            let fingerprint = Fingerprint {
                tick: r.next()?,
                seed: r.next()?,
                next_id: r.next()?,
                digest: r.next()?,
            };
            let state = if r.next()? != 0 {
                Some(decode_snapshot(&mut r)?)
            } else {
                None
            };
            Some(FingerprintBlock { fingerprint, state })
        } else {
            None
        };

        if !r.is_empty() {
            return Err(Error::TrailingWords(r.remaining()));
        }
        Ok(Self {
            tick,
            playing: flags & FLAG_PLAYING != 0,
            sync: flags & FLAG_SYNC != 0,
            ack_tick: tick.wrapping_add_signed(ack_delta),
            ts0,
            ts1,
            events,
            state,
            debug,
        })
    }

    pub fn decode(bytes: &[u8], source: ClientId) -> Result<Self> {
        Self::decode_words(&bytes_to_words(bytes)?, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfire_core::{Actor, ActorKind};

    fn with_state() -> StateData {
        let mut s = StateData::new(99, 3);
        s.tick = 500;
        let id = s.alloc_id();
        s.barrels.push(Actor::new(id, ActorKind::Barrel, 777, 888));
        s.stat_mut(4).frags = 1;
        s
    }

    #[test]
    fn test_header_only_round_trip() {
        let p = Packet {
            tick: 120,
            playing: true,
            ack_tick: 95,
            ts0: 1000,
            ts1: 990,
            ..Default::default()
        };
        let bytes = p.encode();
        assert_eq!(bytes.len(), 6 * 4);
        assert_eq!(Packet::decode(&bytes, 4).unwrap(), p);
    }

    #[test]
    fn test_ack_delta_is_signed() {
        let behind = Packet { tick: 10, ack_tick: 0, ..Default::default() };
        let words = behind.encode_words();
        assert_eq!((words[1] as i32) >> 4, -10);
        assert_eq!(Packet::decode_words(&words, 1).unwrap().ack_tick, 0);

        let ahead = Packet { tick: 10, ack_tick: 25, sync: true, ..Default::default() };
        let back = Packet::decode_words(&ahead.encode_words(), 1).unwrap();
        assert_eq!(back.ack_tick, 25);
        assert!(back.sync && !back.playing);
    }

    #[test]
    fn test_full_packet_round_trip() {
        let source = 6;
        let state = with_state();
        let p = Packet {
            tick: 508,
            playing: true,
            sync: true,
            ack_tick: 506,
            ts0: 5,
            ts1: 4,
            events: vec![
                ClientEvent::new(510, source, 1),
                ClientEvent::new(515, source, 2),
            ],
            state: Some(state.clone()),
            debug: Some(FingerprintBlock {
                fingerprint: state.fingerprint(),
                state: Some(state),
            }),
        };
        assert_eq!(p.flags(), FLAG_PLAYING | FLAG_SYNC | FLAG_STATE | FLAG_DEBUG);
        assert_eq!(Packet::decode(&p.encode(), source).unwrap(), p);
    }

    #[test]
    fn test_events_take_source_id() {
        let p = Packet {
            events: vec![ClientEvent::new(3, 99, 7)],
            ..Default::default()
        };
        let back = Packet::decode(&p.encode(), 2).unwrap();
        assert_eq!(back.events, vec![ClientEvent::new(3, 2, 7)]);
    }

    #[test]
    fn test_trailing_words_rejected() {
        let mut words = Packet::default().encode_words();
        words.push(42);
        assert_eq!(Packet::decode_words(&words, 1), Err(Error::TrailingWords(1)));
    }

    #[test]
    fn test_truncated_packet_rejected() {
        let words = Packet::default().encode_words();
        assert!(Packet::decode_words(&words[..4], 1).is_err());
        assert_eq!(Packet::decode(&[0, 0, 0], 1), Err(Error::Misaligned(3)));
    }
}
