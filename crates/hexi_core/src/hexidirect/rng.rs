//! Deterministic RNG for the engine.
//!
//! Every random choice the engine makes (group and rule selection,
//! random-direction targets, randomize fills) is drawn from one
//! `EngineRng` owned by the world. The seed is recorded so callers and
//! tests can pin behaviour; reseeding replays the same sequence.

use super::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Seed-pinned RNG wrapper over `StdRng`.
#[derive(Clone)]
pub struct EngineRng {
    rng: StdRng,
    seed: u64,
}

impl EngineRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this RNG was created (or last reseeded) with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the sequence from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Uniform index into a collection of length `len`; 0 when empty.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    /// Uniform direction in 1..6.
    pub fn direction(&mut self) -> Direction {
        Direction::ALL[self.rng.gen_range(0..6)]
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        if p >= 1.0 {
            return true;
        }
        if p <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < p
    }

    /// A raw 64-bit value, used for deriving ids and sub-seeds.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }
}

impl fmt::Debug for EngineRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRng").field("seed", &self.seed).finish()
    }
}
