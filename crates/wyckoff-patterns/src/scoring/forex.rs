//! Forex confidence scorer: tick volume is a consistency proxy, not a
//! trustworthy magnitude (`VolumeReliability::Low`), cap 85 (spec.md §4.D).

use super::{ConfidenceScorer, EntryType, SosScoreInputs, SpringScoreInputs};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::asset::AssetClass;
use wyckoff_core::pattern::VolumeReliability;

const FOREX_CAP: Decimal = dec!(85);

pub struct ForexScorer;

impl ConfidenceScorer for ForexScorer {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Forex
    }

    fn volume_reliability(&self) -> VolumeReliability {
        VolumeReliability::Low
    }

    fn max_confidence(&self) -> u8 {
        85
    }

    fn calculate_spring_confidence(&self, i: SpringScoreInputs) -> u8 {
        // Tick volume only confirms pattern consistency, not magnitude.
        let volume = if i.volume_ratio < dec!(0.7) { dec!(10) } else { dec!(0) };

        let penetration = if i.penetration_pct <= dec!(0.02) {
            dec!(45)
        } else if i.penetration_pct <= dec!(0.03) {
            dec!(32)
        } else if i.penetration_pct <= dec!(0.04) {
            dec!(20)
        } else if i.penetration_pct <= dec!(0.05) {
            dec!(8)
        } else {
            dec!(0)
        };

        let recovery = match i.recovery_bars {
            1 => dec!(35),
            2 => dec!(28),
            3 => dec!(20),
            4 | 5 => dec!(12),
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
        // Volume trend bonus disabled for forex: tick volume carries no
        // directional-magnitude signal across tests.

        let total = volume + penetration + recovery + test + creek_bonus;
        total.min(FOREX_CAP).to_u8().unwrap_or(0)
    }

    fn calculate_sos_confidence(&self, i: SosScoreInputs) -> u8 {
        let baseline = match i.entry_type {
            EntryType::Lps => dec!(75),
            EntryType::Direct => dec!(60),
        };

        let volume = if i.volume_ratio > dec!(1.2) { dec!(10) } else { dec!(0) };
        let spread = if i.spread_ratio >= dec!(1.2) {
            dec!(30)
        } else if i.spread_ratio >= dec!(1.0) {
            dec!(15)
        } else {
            dec!(0)
        };
        let close_position = if i.close_position >= dec!(0.8) {
            dec!(25)
        } else if i.close_position >= dec!(0.5) {
            dec!(12)
        } else {
            dec!(0)
        };
        let breakout = if i.breakout_pct >= dec!(0.03) {
            dec!(20)
        } else if i.breakout_pct >= dec!(0.02) {
            dec!(12)
        } else if i.breakout_pct >= dec!(0.01) {
            dec!(5)
        } else {
            dec!(0)
        };
        let duration = (i.duration_score * dec!(15)).min(dec!(15));
        let lps_bonus = if i.lps_held { dec!(10) } else { dec!(0) };
        let phase_bonus = if i.phase_bonus_eligible { dec!(5) } else { dec!(0) };

        let total = baseline + volume + spread + close_position + breakout + duration + lps_bonus + phase_bonus;
        total.min(FOREX_CAP).to_u8().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spring_confidence_never_exceeds_eighty_five() {
        let inputs = SpringScoreInputs {
            volume_ratio: dec!(0.1),
            penetration_pct: dec!(0.01),
            recovery_bars: 1,
            test_confirmed: true,
            creek_strength: dec!(90),
            volume_trend_declining: true,
        };
        assert_eq!(ForexScorer.calculate_spring_confidence(inputs), 85);
    }
}
