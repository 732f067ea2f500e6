//! The replay artifact
//!
//! A replay is everything needed to re-run a session bit for bit: the room
//! settings, one full state, and every event applied after it. Layout:
//!
//! ```text
//! ┌───────┬─────────┬───────┬──────────┬───────────┬───────────────────────┬──────────┐
//! │ magic │ version │ flags │ meta len │ word count│ snapshot + event log  │ metadata │
//! │ 4 B   │ u16     │ u16   │ u32      │ u32       │ words, little-endian  │ bincode  │
//! └───────┴─────────┴───────┴──────────┴───────────┴───────────────────────┴──────────┘
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use meshfire_codec::{
    bytes_to_words, decode_event_log, decode_snapshot, encode_event_log, encode_snapshot,
    WordReader, WordWriter,
};
use meshfire_core::{ClientEvent, ClientId, GameTuning, RoomConfig, StateData, Tick};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

pub const MAGIC: [u8; 4] = *b"MFRP";
pub const FORMAT_VERSION: u16 = 1;

/// Identifies the simulation build; replays only run on the build that
/// recorded them
pub const BUILD_ID: &str = concat!("meshfire/", env!("CARGO_PKG_VERSION"));

const HEADER_LEN: usize = 16;

/// Everything about a recording except the simulation data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    pub room: RoomConfig,
    pub tuning: GameTuning,
    /// Display names by client id, in join order
    pub names: IndexMap<ClientId, String>,
    pub build: String,
    pub recorded_at: DateTime<Utc>,
    /// Last tick covered by the recording
    pub last_tick: Tick,
}

impl ReplayMetadata {
    pub fn new(room: RoomConfig, tuning: GameTuning) -> Self {
        Self {
            room,
            tuning,
            names: IndexMap::new(),
            build: BUILD_ID.to_string(),
            recorded_at: Utc::now(),
            last_tick: 0,
        }
    }
}

/// A recorded session
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub metadata: ReplayMetadata,
    /// State the recording starts from
    pub snapshot: StateData,
    /// Every applied event after the snapshot, in application order
    pub events: Vec<ClientEvent>,
}

impl Replay {
    /// First tick that can be reached
    pub fn first_tick(&self) -> Tick {
        self.snapshot.tick
    }

    pub fn last_tick(&self) -> Tick {
        self.metadata.last_tick
    }

    /// Refuse replays recorded by a different build
    pub fn check_build(&self) -> Result<()> {
        if self.metadata.build == BUILD_ID {
            return Ok(());
        }
        error!(
            expected = BUILD_ID,
            found = %self.metadata.build,
            "replay recorded by another build"
        );
        Err(Error::BuildMismatch {
            expected: BUILD_ID.to_string(),
            found: self.metadata.build.clone(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta = bincode::serialize(&self.metadata)?;
        let mut w = WordWriter::new();
        encode_snapshot(&mut w, &self.snapshot);
        encode_event_log(&mut w, &self.events);

        let mut out = Vec::with_capacity(HEADER_LEN + w.len() * 4 + meta.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        out.extend_from_slice(&(w.len() as u32).to_le_bytes());
        out.extend_from_slice(&w.to_bytes());
        out.extend_from_slice(&meta);
        Ok(out)
    }

    /// Parse a replay
    ///
    /// Only the structure is checked here; call
    /// [`check_build`](Self::check_build) before trusting it to replay.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated("header"));
        }
        if bytes[..4] != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let meta_len = read_u32(bytes, 8) as usize;
        let word_count = read_u32(bytes, 12) as usize;

        let words_end = word_count
            .checked_mul(4)
            .and_then(|n| n.checked_add(HEADER_LEN))
            .filter(|&end| end <= bytes.len())
            .ok_or(Error::Truncated("simulation data"))?;
        let meta_end = words_end
            .checked_add(meta_len)
            .filter(|&end| end <= bytes.len())
            .ok_or(Error::Truncated("metadata"))?;

        let words = bytes_to_words(&bytes[HEADER_LEN..words_end])?;
        let mut r = WordReader::new(&words);
        let snapshot = decode_snapshot(&mut r)?;
        let events = decode_event_log(&mut r)?;
        let metadata: ReplayMetadata = bincode::deserialize(&bytes[words_end..meta_end])?;
        debug!(
            first = snapshot.tick,
            last = metadata.last_tick,
            events = events.len(),
            "replay parsed"
        );
        Ok(Self {
            metadata,
            snapshot,
            events,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshfire_core::SimulationContext;

    fn sample() -> Replay {
        let room = RoomConfig::default();
        let ctx = SimulationContext::new(&room, GameTuning::default()).unwrap();
        let mut metadata = ReplayMetadata::new(room, GameTuning::default());
        metadata.names.insert(3, "ada".to_string());
        metadata.names.insert(1, "bo".to_string());
        metadata.last_tick = 40;
        Replay {
            metadata,
            snapshot: ctx.state,
            events: vec![
                ClientEvent::new(4, 1, 0x80_0000),
                ClientEvent::new(4, 3, 0x80_0000),
                ClientEvent::new(19, 1, 0x1_0040),
            ],
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let replay = sample();
        let bytes = replay.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"MFRP");
        let back = Replay::from_bytes(&bytes).unwrap();
        assert_eq!(back, replay);
        // name order survives
        assert_eq!(back.metadata.names.keys().copied().collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert!(matches!(Replay::from_bytes(b"nope"), Err(Error::Truncated(_))));
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(Replay::from_bytes(&bytes), Err(Error::BadMagic)));

        let mut bytes = sample().to_bytes().unwrap();
        bytes[4] = 9;
        assert!(matches!(Replay::from_bytes(&bytes), Err(Error::UnsupportedVersion(9))));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = sample().to_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(Replay::from_bytes(cut), Err(Error::Truncated("metadata"))));
        assert!(matches!(
            Replay::from_bytes(&bytes[..HEADER_LEN + 8]),
            Err(Error::Truncated("simulation data"))
        ));
    }

    #[test]
    fn test_build_mismatch() {
        let mut replay = sample();
        replay.check_build().unwrap();
        replay.metadata.build = "meshfire/0.0.0-old".to_string();
        let bytes = replay.to_bytes().unwrap();
        let loaded = Replay::from_bytes(&bytes).unwrap();
        assert!(matches!(
            loaded.check_build(),
            Err(Error::BuildMismatch { .. })
        ));
    }
}
