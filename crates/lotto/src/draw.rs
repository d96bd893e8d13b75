//! Draw result

use serde::{Deserialize, Serialize};

use crate::{MAX_NUMBER, MIN_NUMBER, PRIMARY_COUNT};

/// One generated set of lottery numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LottoDraw {
    /// Primary numbers, ascending
    pub numbers: [u8; PRIMARY_COUNT],
    /// Bonus number, distinct from every primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u8>,
}

impl LottoDraw {
    /// Build a draw, sorting the primaries
    pub fn new(mut numbers: [u8; PRIMARY_COUNT], bonus: Option<u8>) -> Self {
        numbers.sort_unstable();
        Self { numbers, bonus }
    }

    /// Whether `n` is one of the primary numbers
    pub fn contains(&self, n: u8) -> bool {
        self.numbers.binary_search(&n).is_ok()
    }

    /// Check range, ordering and distinctness of the whole draw
    pub fn is_valid(&self) -> bool {
        let in_range = |n: u8| (MIN_NUMBER..=MAX_NUMBER).contains(&n);

        if !self.numbers.iter().all(|&n| in_range(n)) {
            return false;
        }
        // strictly ascending implies pairwise distinct
        if !self.numbers.windows(2).all(|w| w[0] < w[1]) {
            return false;
        }
        match self.bonus {
            Some(b) => in_range(b) && !self.contains(b),
            None => true,
        }
    }
}
