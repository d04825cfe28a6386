//! Derives Creek, Ice, and Jump from clustered support/resistance levels,
//! and scores the resulting range's quality (spec.md §4.B).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::levels::{CreekLevel, IceLevel, JumpTarget};

/// Creek is the lowest support cluster, Ice the highest resistance cluster
/// above it. Returns `None` if no resistance cluster sits above every
/// support cluster (the range hasn't formed yet).
pub fn compute_creek_ice(
    support: &[CreekLevel],
    resistance: &[IceLevel],
) -> Option<(CreekLevel, IceLevel)> {
    let creek = support.iter().min_by_key(|l| l.price)?.clone();
    let ice = resistance
        .iter()
        .filter(|l| l.price > creek.price)
        .max_by_key(|l| l.price)?
        .clone();
    Some((creek, ice))
}

pub fn compute_jump(creek: &CreekLevel, ice: &IceLevel) -> JumpTarget {
    JumpTarget::from_creek_ice(creek.price, ice.price)
}

/// Quality is the average strength of the two bounding clusters — a range
/// held up by two-touch clusters on each side scores 40, well under the
/// configured floor; a range confirmed by five or more touches per side
/// saturates at 100.
pub fn score_quality(creek: &CreekLevel, ice: &IceLevel) -> Decimal {
    ((creek.strength + ice.strength) / Decimal::from(2)).min(Decimal::from(100))
}

/// A Wyckoff "cause" multiplier in [2.0, 3.0], widening with how far the
/// range has pushed relative to its own support level.
pub fn estimate_cause_factor(creek: &CreekLevel, ice: &IceLevel) -> Decimal {
    if creek.price <= Decimal::ZERO {
        return dec!(2.0);
    }
    let width_pct = (ice.price - creek.price) / creek.price;
    (dec!(2.0) + (width_pct * dec!(10))).clamp(dec!(2.0), dec!(3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: Decimal, strength: Decimal) -> CreekLevel {
        CreekLevel {
            price,
            strength,
            provenance: vec![0, 1],
        }
    }

    #[test]
    fn picks_lowest_support_and_highest_resistance_above_it() {
        let support = vec![level(dec!(100), dec!(60)), level(dec!(90), dec!(40))];
        let resistance = vec![level(dec!(120), dec!(80)), level(dec!(95), dec!(40))];
        let (creek, ice) = compute_creek_ice(&support, &resistance).unwrap();
        assert_eq!(creek.price, dec!(90));
        assert_eq!(ice.price, dec!(120));
    }

    #[test]
    fn cause_factor_is_clamped() {
        let creek = level(dec!(100), dec!(60));
        let ice = level(dec!(200), dec!(80));
        assert_eq!(estimate_cause_factor(&creek, &ice), dec!(3.0));
    }
}
