//! Pronunciation scoring
//!
//! There is no acoustic comparison here. [`RandomScorer`] is a placeholder
//! that ignores both recordings and returns a uniform integer in `[60, 100]`.
//! It sits behind the [`Scorer`] trait so a real comparison can replace it
//! without touching the callers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lowest score the placeholder returns
pub const MIN_STUB_SCORE: u8 = 60;

/// Highest possible score
pub const MAX_SCORE: u8 = 100;

/// Compares a native recording with the user's attempt
pub trait Scorer {
    /// Accuracy in `[0, 100]`
    fn compare(&mut self, native_url: Option<&str>, user_url: &str) -> u8;
}

/// Placeholder scorer drawing uniform random scores
#[derive(Debug, Clone)]
pub struct RandomScorer<R: Rng = StdRng> {
    rng: R,
}

impl RandomScorer<StdRng> {
    /// Scorer seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Scorer with a fixed seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomScorer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomScorer<R> {
    /// Scorer drawing from `rng`
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Scorer for RandomScorer<R> {
    fn compare(&mut self, _native_url: Option<&str>, _user_url: &str) -> u8 {
        self.rng.gen_range(MIN_STUB_SCORE..=MAX_SCORE)
    }
}

/// Scorer returning a constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScorer(pub u8);

impl Scorer for FixedScorer {
    fn compare(&mut self, _native_url: Option<&str>, _user_url: &str) -> u8 {
        self.0.min(MAX_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_scores_in_stub_range() {
        let mut scorer = RandomScorer::seeded(7);
        for _ in 0..500 {
            let score = scorer.compare(Some("/native.mp3"), "blob:memory/1");
            assert!((MIN_STUB_SCORE..=MAX_SCORE).contains(&score));
        }
    }

    #[test]
    fn test_seeded_scores_repeat() {
        let mut a = RandomScorer::seeded(42);
        let mut b = RandomScorer::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.compare(None, "u"), b.compare(None, "u"));
        }
    }

    #[test]
    fn test_with_rng() {
        let mut scorer = RandomScorer::with_rng(StdRng::seed_from_u64(1));
        assert!(scorer.compare(None, "u") >= MIN_STUB_SCORE);
    }

    #[test]
    fn test_fixed_scorer_clamped() {
        assert_eq!(FixedScorer(85).compare(None, "u"), 85);
        assert_eq!(FixedScorer(250).compare(None, "u"), 100);
    }
}
