//! Meshfire Codec - Bit-packed wire format
//!
//! Everything peers exchange is a flat sequence of 32-bit words:
//!
//! - **Actors**: a header word, the id, one word per axis and a status word,
//!   plus per-kind extras (see [`actor`])
//! - **Events**: tick-sorted, delta-encoded, zero-terminated (see [`events`])
//! - **Snapshots**: state header, actors in list order, stats table
//! - **Packets**: header, events, optional snapshot and fingerprint block
//!
//! Field widths and shifts come from `meshfire_core::layout`, the same table
//! the simulation quantizes against, so a value that survives a tick always
//! survives a round trip.
//!
//! # Example
//!
//! ```
//! use meshfire_codec::Packet;
//! use meshfire_core::ClientEvent;
//!
//! let packet = Packet {
//!     tick: 40,
//!     playing: true,
//!     ack_tick: 38,
//!     events: vec![ClientEvent::new(48, 1, 0x10)],
//!     ..Default::default()
//! };
//! let bytes = packet.encode();
//! assert_eq!(Packet::decode(&bytes, 1).unwrap(), packet);
//! ```

pub mod actor;
mod error;
pub mod events;
pub mod packet;
pub mod snapshot;
pub mod words;

pub use actor::{decode_actor, encode_actor};
pub use error::{Error, Result};
pub use events::{decode_event_log, decode_events, encode_event_log, encode_events};
pub use packet::{FingerprintBlock, Packet};
pub use snapshot::{decode_snapshot, encode_snapshot, snapshot_to_bytes};
pub use words::{bytes_to_words, words_to_bytes, WordReader, WordWriter};
