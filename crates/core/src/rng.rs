//! Deterministic random number generation.
//!
//! Every stochastic decision in the core (room picks, break-target picks,
//! prompt re-rolls, ambient cue rolls) draws from a stateless oracle seeded
//! by the run seed and a per-decision nonce. Given the same seed and the
//! same input trace, an entire run replays identically.

/// Oracle for deterministic random number generation.
///
/// Implementations must be pure: the same seed always yields the same value.
pub trait RngOracle {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let span = max - min + 1;
        min + (self.next_u32(seed) % span)
    }

    /// Roll against a probability in [0, 1].
    fn chance(&self, seed: u64, probability: f32) -> bool {
        let roll = self.next_u32(seed) as f64 / u32::MAX as f64;
        roll < probability as f64
    }
}

/// PCG random number generator (PCG-XSH-RR variant).
///
/// Small state, fast, and statistically solid; the single multiply plus
/// xorshift-rotate output keeps replays cheap.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    /// Advance the LCG state by one step.
    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR output permutation: xorshift high bits, random rotate.
    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::output(Self::step(seed))
    }
}

/// Compute a deterministic seed from run-level entropy sources.
///
/// `run_seed` is fixed at setup, `nonce` increments once per decision, and
/// `context` distinguishes multiple independent rolls inside one decision
/// (e.g. target kind vs. target index).
pub fn compute_seed(run_seed: u64, nonce: u64, context: u32) -> u64 {
    // SplitMix64/FxHash style mixing with a final avalanche.
    let mut hash = run_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (context as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}
