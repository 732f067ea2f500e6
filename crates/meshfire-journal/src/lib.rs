//! Meshfire Journal - Replay recording and playback
//!
//! A replay stores the room settings, one full state and every event
//! applied after it. Because the simulation is deterministic, that is
//! enough to reproduce the whole session:
//!
//! - **ReplayRecorder**: collects applied events while a session runs
//! - **Replay**: the artifact, with its binary format and build check
//! - **ReplayPlayer**: steps or seeks through a replay
//! - **Exporter**: metadata and event statistics as RON, JSON or text
//!
//! # Example
//!
//! ```rust,ignore
//! use meshfire_journal::{Replay, ReplayPlayer, ReplayRecorder};
//!
//! let mut recorder = ReplayRecorder::new(room.clone(), tuning.clone());
//! recorder.start(session.state().unwrap());
//! loop {
//!     session.update(now)?;
//!     recorder.record(session.state().unwrap(), &session.take_applied());
//! }
//! recorder.finish()?.save("match.mfr")?;
//!
//! let mut player = ReplayPlayer::new(Replay::load("match.mfr")?)?;
//! player.goto(600)?;
//! ```

mod error;
mod exporter;
mod player;
mod recorder;
mod replay;

pub use error::{Error, Result};
pub use exporter::{ExportFormat, Exporter};
pub use player::ReplayPlayer;
pub use recorder::ReplayRecorder;
pub use replay::{Replay, ReplayMetadata, BUILD_ID, FORMAT_VERSION, MAGIC};
