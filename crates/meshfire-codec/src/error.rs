//! Error types for meshfire-codec

use thiserror::Error;

/// Decoding error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Unexpected end of data at word {0}")]
    UnexpectedEnd(usize),

    #[error("Byte length {0} is not a multiple of 4")]
    Misaligned(usize),

    #[error("Unknown actor type tag {0}")]
    UnknownActorType(u32),

    #[error("Actor type {0} cannot appear in a state snapshot")]
    UnexpectedActorType(u32),

    #[error("{0} trailing words after packet")]
    TrailingWords(usize),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
