//! Asset-class-aware confidence scoring (spec.md §4.D, §9 Design Notes).
//! Detectors never branch on asset class themselves; they consult whichever
//! `ConfidenceScorer` the `ScorerFactory` selects.

mod forex;
mod stock;

pub use forex::ForexScorer;
pub use stock::StockScorer;

use rust_decimal::Decimal;
use wyckoff_core::asset::AssetClass;
use wyckoff_core::pattern::VolumeReliability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Lps,
    Direct,
}

#[derive(Debug, Clone, Copy)]
pub struct SpringScoreInputs {
    pub volume_ratio: Decimal,
    pub penetration_pct: Decimal,
    pub recovery_bars: u8,
    pub test_confirmed: bool,
    /// Strength of the Creek cluster this Spring pierced, 0-100.
    pub creek_strength: Decimal,
    /// Whether volume across prior Secondary Tests has been declining.
    pub volume_trend_declining: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SosScoreInputs {
    pub volume_ratio: Decimal,
    pub spread_ratio: Decimal,
    pub close_position: Decimal,
    pub breakout_pct: Decimal,
    /// Normalized 0-1 how far through the range's typical duration this
    /// breakout came; higher rewards breakouts late in the range.
    pub duration_score: Decimal,
    pub lps_held: bool,
    pub phase_bonus_eligible: bool,
    pub entry_type: EntryType,
}

pub trait ConfidenceScorer {
    fn asset_class(&self) -> AssetClass;
    fn volume_reliability(&self) -> VolumeReliability;
    fn max_confidence(&self) -> u8;
    fn calculate_spring_confidence(&self, inputs: SpringScoreInputs) -> u8;
    fn calculate_sos_confidence(&self, inputs: SosScoreInputs) -> u8;
}

pub struct ScorerFactory;

impl ScorerFactory {
    pub fn for_asset_class(asset_class: AssetClass) -> Box<dyn ConfidenceScorer + Send + Sync> {
        match asset_class {
            AssetClass::Stock => Box::new(StockScorer),
            AssetClass::Forex => Box::new(ForexScorer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_picks_scorer_by_asset_class() {
        let stock = ScorerFactory::for_asset_class(AssetClass::Stock);
        assert_eq!(stock.max_confidence(), 100);
        let forex = ScorerFactory::for_asset_class(AssetClass::Forex);
        assert_eq!(forex.max_confidence(), 85);
    }
}
