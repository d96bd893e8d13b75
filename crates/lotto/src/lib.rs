//! Lottery Number Generator
//!
//! Draws six distinct numbers from 1..=45, plus an optional bonus number.
//! Despite the `predict` naming this is pure chance: every combination is
//! equally likely and no draw history is consulted.

mod draw;
mod predictor;

pub use draw::LottoDraw;
pub use predictor::{predict, predict_with_bonus, Predictor};

/// Smallest number that can be drawn
pub const MIN_NUMBER: u8 = 1;

/// Largest number that can be drawn
pub const MAX_NUMBER: u8 = 45;

/// Primary numbers per draw
pub const PRIMARY_COUNT: usize = 6;
