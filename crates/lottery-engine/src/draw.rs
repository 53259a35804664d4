use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the target number drawn when a round closes.
///
/// Implementations return a value in `0..=max_guess`; the engine clamps
/// anything larger.
pub trait TargetSource: Send {
    fn draw_target(&mut self, max_guess: u32) -> u32;
}

impl<F> TargetSource for F
where
    F: FnMut(u32) -> u32 + Send,
{
    fn draw_target(&mut self, max_guess: u32) -> u32 {
        self(max_guess)
    }
}

/// Uniform draw backed by a seedable PRNG.
#[derive(Debug, Clone)]
pub struct RandomTarget {
    rng: StdRng,
}

impl RandomTarget {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomTarget {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl TargetSource for RandomTarget {
    fn draw_target(&mut self, max_guess: u32) -> u32 {
        self.rng.gen_range(0..=max_guess)
    }
}
