//! Deterministic random number generator.
//!
//! Uses Xorshift128+ for fast, high-quality, deterministic randomness. Given
//! the same seed, produces an identical sequence on every platform, which is
//! what lets two peers (or a client and server) replay the same match and
//! land on the same state.

use serde::{Deserialize, Serialize};

use super::color::Color;

/// Deterministic PRNG using Xorshift128+.
///
/// # Determinism guarantee
///
/// Given the same seed, this RNG produces the exact same sequence of values
/// on any platform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed, using SplitMix64 to spread a
    /// weak seed into good initial state.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        let state = if state0 == 0 && state1 == 0 { [1, 1] } else { [state0, state1] };
        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Random integer in `[0, max)`. Rejection-free modulo; acceptable bias
    /// for the small ranges (column counts, color counts) this is used for.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Shuffle a slice in place with Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Supplies the two independent deterministic color streams the Arbiter
/// needs: one for ordinary spawned rows (`next_spawn`), one for garbage
/// loot (`next_emerge`). Both streams are pure functions of the seed and
/// call count, so any two peers seeded identically and calling in the same
/// order produce the same colors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorSupplier {
    rng: DeterministicRng,
}

impl ColorSupplier {
    pub fn new(seed: u64) -> Self {
        ColorSupplier { rng: DeterministicRng::new(seed) }
    }

    pub fn next_spawn(&mut self) -> Color {
        Color::from_spawn_index(self.rng.next_u32())
    }

    pub fn next_emerge(&mut self) -> Color {
        Color::from_spawn_index(self.rng.next_u32())
    }

    pub fn state(&self) -> [u64; 2] {
        self.rng.state()
    }

    pub fn set_state(&mut self, state: [u64; 2]) {
        self.rng.set_state(state);
    }
}
