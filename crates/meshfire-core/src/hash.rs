//! Deterministic hashing for state fingerprints
//!
//! Unlike `std::collections::hash_map::DefaultHasher`, which uses random keys,
//! these functions produce the same output for the same inputs across runs
//! and platforms, so two peers can compare digests of their states.
//!
//! # Example
//!
//! ```
//! use meshfire_core::hash::{hash_words_with_seed, DEFAULT_HASH_SEED};
//!
//! let h1 = hash_words_with_seed(&[1, 2, 3], DEFAULT_HASH_SEED);
//! let h2 = hash_words_with_seed(&[1, 2, 3], DEFAULT_HASH_SEED);
//! assert_eq!(h1, h2);
//! ```

/// Seed used for state digests
pub const DEFAULT_HASH_SEED: u64 = 0x6d65_7368_6669_7265;

/// Mix a seed with two values (splitmix64 finalizer)
pub fn hash_seed(seed: u64, a: u64, b: u64) -> u64 {
    let mut z = seed
        .wrapping_add(a.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(b.wrapping_mul(0xc2b2_ae3d_27d4_eb4f));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hash a slice of 32-bit words with a seed
///
/// FNV-1a over the words with a periodic [`hash_seed`] mix to keep the
/// distribution good for long inputs.
pub fn hash_words_with_seed(words: &[u32], seed: u64) -> u64 {
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut h = seed;
    for (i, &w) in words.iter().enumerate() {
        h ^= w as u64;
        h = h.wrapping_mul(FNV_PRIME);
        if i % 8 == 7 {
            h = hash_seed(seed, h, i as u64);
        }
    }
    hash_seed(seed, h, words.len() as u64)
}

/// Incremental word hasher, for hashing structures without building a buffer
#[derive(Debug, Clone)]
pub struct WordHasher {
    seed: u64,
    h: u64,
    count: u64,
}

impl WordHasher {
    /// Create a hasher with the given seed
    pub fn new(seed: u64) -> Self {
        Self { seed, h: seed, count: 0 }
    }

    /// Feed one word
    pub fn write(&mut self, word: u32) {
        const FNV_PRIME: u64 = 0x100000001b3;
        self.h ^= word as u64;
        self.h = self.h.wrapping_mul(FNV_PRIME);
        if self.count % 8 == 7 {
            self.h = hash_seed(self.seed, self.h, self.count);
        }
        self.count += 1;
    }

    /// Finish, folding the 64-bit state into a 32-bit digest
    pub fn finish32(&self) -> u32 {
        let h = hash_seed(self.seed, self.h, self.count);
        (h ^ (h >> 32)) as u32
    }

    /// Finish with the full 64-bit state
    pub fn finish(&self) -> u64 {
        hash_seed(self.seed, self.h, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_words_deterministic() {
        let h1 = hash_words_with_seed(&[42, 7], DEFAULT_HASH_SEED);
        let h2 = hash_words_with_seed(&[42, 7], DEFAULT_HASH_SEED);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_words_different_values() {
        let h1 = hash_words_with_seed(&[0], DEFAULT_HASH_SEED);
        let h2 = hash_words_with_seed(&[1], DEFAULT_HASH_SEED);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_hash_words_different_seeds() {
        let h1 = hash_words_with_seed(&[42], 100);
        let h2 = hash_words_with_seed(&[42], 200);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_incremental_matches_slice() {
        let words: Vec<u32> = (0..20).collect();
        let mut hasher = WordHasher::new(DEFAULT_HASH_SEED);
        for w in &words {
            hasher.write(*w);
        }
        assert_eq!(hasher.finish(), hash_words_with_seed(&words, DEFAULT_HASH_SEED));
    }

    #[test]
    fn test_order_matters() {
        let h1 = hash_words_with_seed(&[1, 2], DEFAULT_HASH_SEED);
        let h2 = hash_words_with_seed(&[2, 1], DEFAULT_HASH_SEED);
        assert_ne!(h1, h2);
    }
}
