//! Random draw generation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{LottoDraw, MAX_NUMBER, MIN_NUMBER, PRIMARY_COUNT};

/// Draw six numbers with the thread-local RNG
pub fn predict() -> LottoDraw {
    Predictor::from_rng(rand::thread_rng()).draw(false)
}

/// Draw six numbers plus a bonus number with the thread-local RNG
pub fn predict_with_bonus() -> LottoDraw {
    Predictor::from_rng(rand::thread_rng()).draw(true)
}

/// Lottery draw generator over an arbitrary random source
pub struct Predictor<R = StdRng> {
    rng: R,
}

impl Predictor<StdRng> {
    /// Create a reproducible predictor
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Predictor<R> {
    /// Create a predictor drawing from `rng`
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Sample without replacement from 1..=45.
    ///
    /// Runs a partial Fisher-Yates shuffle over the full pool and keeps the
    /// first six positions as primaries. When `include_bonus` is set the
    /// seventh position becomes the bonus, which makes it uniform over the
    /// 39 numbers not already drawn.
    pub fn draw(&mut self, include_bonus: bool) -> LottoDraw {
        let mut pool: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER).collect();
        let amount = if include_bonus { PRIMARY_COUNT + 1 } else { PRIMARY_COUNT };

        let (picked, _) = pool.partial_shuffle(&mut self.rng, amount);

        let mut numbers = [0u8; PRIMARY_COUNT];
        numbers.copy_from_slice(&picked[..PRIMARY_COUNT]);
        let bonus = picked.get(PRIMARY_COUNT).copied();

        let draw = LottoDraw::new(numbers, bonus);
        debug!("Drew {:?} bonus {:?}", draw.numbers, draw.bonus);
        draw
    }
}
