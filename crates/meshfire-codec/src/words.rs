//! 32-bit word buffers
//!
//! Everything on the wire is a sequence of little-endian 32-bit words.

use crate::error::{Error, Result};
use meshfire_core::layout::Field;

/// Append-only word buffer
#[derive(Debug, Clone, Default)]
pub struct WordWriter {
    words: Vec<u32>,
}

impl WordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, word: u32) {
        self.words.push(word);
    }

    pub fn push_i32(&mut self, value: i32) {
        self.words.push(value as u32);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }

    /// Serialize to little-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.words)
    }
}

/// Sequential reader over a word slice
#[derive(Debug, Clone)]
pub struct WordReader<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> WordReader<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self { words, pos: 0 }
    }

    /// Read the next word
    pub fn next(&mut self) -> Result<u32> {
        let word = *self
            .words
            .get(self.pos)
            .ok_or(Error::UnexpectedEnd(self.pos))?;
        self.pos += 1;
        Ok(word)
    }

    pub fn next_i32(&mut self) -> Result<i32> {
        self.next().map(|w| w as i32)
    }

    /// Number of unread words
    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Store `value` into a field, asserting its range in debug builds
///
/// An out-of-range value is a construction bug upstream; release builds
/// truncate it.
pub fn pack(word: u32, field: Field, value: u32) -> u32 {
    debug_assert!(
        field.fits(value),
        "value {value} does not fit {} bits at shift {}",
        field.bits,
        field.shift
    );
    field.put(word, value)
}

pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    bytes
}

pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::Misaligned(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
