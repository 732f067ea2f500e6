//! Error types for meshfire-netcode

use meshfire_core::{ClientId, Tick};
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// A packet could not be decoded
    #[error("Malformed packet: {0}")]
    Codec(#[from] meshfire_codec::Error),

    /// Room setup failed
    #[error("Room setup failed: {0}")]
    Core(#[from] meshfire_core::Error),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Fingerprints disagree; the session cannot continue
    #[error("State out of sync with peer {peer} at tick {tick} ({} fields differ)", fields.len())]
    Desync {
        tick: Tick,
        peer: ClientId,
        fields: Vec<String>,
    },

    /// The session was torn down by an earlier fatal error
    #[error("Session closed after desync at tick {0}")]
    Closed(Tick),
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
