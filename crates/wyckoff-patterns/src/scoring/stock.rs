//! Stock confidence scorer: reported volume is trustworthy
//! (`VolumeReliability::High`), cap 100 (spec.md §4.D).

use super::{ConfidenceScorer, EntryType, SosScoreInputs, SpringScoreInputs};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::asset::AssetClass;
use wyckoff_core::pattern::VolumeReliability;

pub struct StockScorer;

impl ConfidenceScorer for StockScorer {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Stock
    }

    fn volume_reliability(&self) -> VolumeReliability {
        VolumeReliability::High
    }

    fn max_confidence(&self) -> u8 {
        100
    }

    fn calculate_spring_confidence(&self, i: SpringScoreInputs) -> u8 {
        let volume = if i.volume_ratio < dec!(0.3) {
            dec!(40)
        } else if i.volume_ratio < dec!(0.4) {
            dec!(30)
        } else if i.volume_ratio < dec!(0.5) {
            dec!(20)
        } else if i.volume_ratio < dec!(0.6) {
            dec!(10)
        } else if i.volume_ratio < dec!(0.7) {
            dec!(5)
        } else {
            dec!(0)
        };

        let penetration = if i.penetration_pct <= dec!(0.02) {
            dec!(35)
        } else if i.penetration_pct <= dec!(0.03) {
            dec!(25)
        } else if i.penetration_pct <= dec!(0.04) {
            dec!(15)
        } else if i.penetration_pct <= dec!(0.05) {
            dec!(5)
        } else {
            dec!(0)
        };

        let recovery = match i.recovery_bars {
            1 => dec!(25),
            2 => dec!(20),
            3 => dec!(15),
            4 | 5 => dec!(10),
            _ => dec!(0),
        };

        let test = if i.test_confirmed { dec!(20) } else { dec!(0) };
        let creek_bonus = if i.creek_strength >= dec!(80) {
            dec!(10)
        } else if i.creek_strength >= dec!(60) {
            dec!(7)
        } else if i.creek_strength >= dec!(40) {
            dec!(4)
        } else {
            dec!(0)
        };
        let trend_bonus = if i.volume_trend_declining { dec!(10) } else { dec!(0) };

        let total = volume + penetration + recovery + test + creek_bonus + trend_bonus;
        total.min(Decimal::from(100)).to_u8().unwrap_or(0)
    }

    fn calculate_sos_confidence(&self, i: SosScoreInputs) -> u8 {
        let baseline = match i.entry_type {
            EntryType::Lps => dec!(80),
            EntryType::Direct => dec!(65),
        };

        let volume = if (dec!(2.0)..=dec!(2.3)).contains(&i.volume_ratio) {
            dec!(35)
        } else if i.volume_ratio > dec!(1.5) {
            dec!(20)
        } else if i.volume_ratio > dec!(0.8) {
            dec!(10)
        } else {
            dec!(0)
        };
        let spread = if i.spread_ratio >= dec!(1.2) {
            dec!(20)
        } else if i.spread_ratio >= dec!(1.0) {
            dec!(10)
        } else {
            dec!(0)
        };
        let close_position = if i.close_position >= dec!(0.8) {
            dec!(20)
        } else if i.close_position >= dec!(0.5) {
            dec!(10)
        } else {
            dec!(0)
        };
        let breakout = if i.breakout_pct >= dec!(0.03) {
            dec!(15)
        } else if i.breakout_pct >= dec!(0.02) {
            dec!(10)
        } else if i.breakout_pct >= dec!(0.01) {
            dec!(5)
        } else {
            dec!(0)
        };
        let duration = (i.duration_score * dec!(10)).min(dec!(10));
        let lps_bonus = if i.lps_held { dec!(15) } else { dec!(0) };
        let phase_bonus = if i.phase_bonus_eligible { dec!(5) } else { dec!(0) };

        let total = baseline + volume + spread + close_position + breakout + duration + lps_bonus + phase_bonus;
        total.min(Decimal::from(100)).to_u8().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excellent_spring_scores_near_cap() {
        let inputs = SpringScoreInputs {
            volume_ratio: dec!(0.22),
            penetration_pct: dec!(0.015),
            recovery_bars: 1,
            test_confirmed: true,
            creek_strength: dec!(85),
            volume_trend_declining: true,
        };
        let score = StockScorer.calculate_spring_confidence(inputs);
        assert_eq!(score, 100);
    }
}
