//! Error types for meshfire-journal

use meshfire_core::Tick;
use thiserror::Error;

/// Journal error type
#[derive(Debug, Error)]
pub enum Error {
    /// Not a replay file
    #[error("Not a replay (bad magic)")]
    BadMagic,

    /// Written by an incompatible format revision
    #[error("Unsupported replay format version {0}")]
    UnsupportedVersion(u16),

    /// The file ends early or a length field points past the end
    #[error("Replay truncated: {0}")]
    Truncated(&'static str),

    /// Recorded by a build whose simulation may differ from this one
    #[error("Replay built by {found}, this build is {expected}")]
    BuildMismatch { expected: String, found: String },

    /// Target tick outside the recorded range
    #[error("Tick {tick} outside recorded range {first}..={last}")]
    TickOutOfRange { tick: Tick, first: Tick, last: Tick },

    /// Nothing was recorded yet
    #[error("Recorder has no starting state")]
    NotStarted,

    /// Snapshot or event stream could not be decoded
    #[error("Codec error: {0}")]
    Codec(#[from] meshfire_codec::Error),

    /// Replayed room could not be set up
    #[error("Simulation setup failed: {0}")]
    Core(#[from] meshfire_core::Error),

    /// Metadata block could not be (de)serialized
    #[error("Metadata error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Export error
    #[error("Export error: {0}")]
    ExportError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, Error>;
