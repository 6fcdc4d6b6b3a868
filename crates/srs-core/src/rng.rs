//! Deterministic pseudo-random stream.
//!
//! # Determinism strategy
//!
//! Every component that needs randomness is handed its own [`SimRng`], either
//! seeded directly or derived via [`SimRng::child`]:
//!
//!   child_seed = next_u64() XOR (offset * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive offsets uniformly across the seed space.  Given
//! the same root seed and configuration, every run draws identical streams —
//! there is no process-global RNG anywhere.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seedable deterministic RNG handed to each component that needs one.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child stream with a different seed offset — used to give each
    /// router its own independent stream from the candidate's root seed.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn random_f64(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Uniform index into a collection of length `len`.
    ///
    /// # Panics
    /// Panics if `len == 0`; callers check emptiness first.
    #[inline]
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}
