//! Creek (support), Ice (resistance), and Jump (measured-move target)
//! levels computed by the Range & Level Detector (spec.md §3, §4.B).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price level voted for by a cluster of pivots, with a strength score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelVote {
    pub price: Decimal,
    /// Strength in [0, 100].
    pub strength: Decimal,
    /// Indices of the bars whose pivots voted for this level.
    pub provenance: Vec<usize>,
}

/// Support level of a trading range (lowest support cluster).
pub type CreekLevel = LevelVote;

/// Resistance level of a trading range (highest resistance cluster).
pub type IceLevel = LevelVote;

/// Measured-move target: Ice + (Ice - Creek).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpTarget {
    pub price: Decimal,
}

impl JumpTarget {
    pub fn from_creek_ice(creek: Decimal, ice: Decimal) -> Self {
        Self {
            price: ice + (ice - creek),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn jump_is_measured_move() {
        let jump = JumpTarget::from_creek_ice(dec!(90), dec!(100));
        assert_eq!(jump.price, dec!(110));
    }
}
