//! Error types for meshfire-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown weapon id {0}")]
    UnknownWeapon(u8),

    #[error("Unknown actor type tag {0}")]
    UnknownActorType(u32),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
