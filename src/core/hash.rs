//! State hashing.
//!
//! Gives determinism and rollback-equivalence tests a cheap equality oracle:
//! two independently produced `GameState`s are equal for our purposes if
//! their hashes match, which is much less code than deriving `PartialEq`
//! across every nested pit/physical/journal collection.

use sha2::{Digest, Sha256};

pub type StateHash = [u8; 32];

/// Wraps SHA-256 with helpers for the primitive types that make up a
/// `GameState`. Order of updates is part of the hash, so callers must visit
/// fields in a fixed order.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    pub fn for_game_state() -> Self {
        Self::new(b"SHITBRIX_STATE_V1")
    }

    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_updates_same_hash() {
        let make_hash = || {
            let mut h = StateHasher::for_game_state();
            h.update_u64(100);
            h.update_bool(true);
            h.finalize()
        };
        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };
        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn domain_separates() {
        let data = [1u8, 2, 3, 4];
        assert_ne!(hash_with_domain(b"A", &data), hash_with_domain(b"B", &data));
    }
}
