//! Component B: pivot detection -> clustering -> quality scoring -> Creek /
//! Ice / Jump -> TradingRange (spec.md §4.B).

use crate::clustering::cluster_pivots;
use crate::error::RangesError;
use crate::levels::{compute_creek_ice, compute_jump, estimate_cause_factor, score_quality};
use crate::pivots::{detect_pivots, PivotKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::phase::WyckoffPhase;
use wyckoff_core::range::{RangeStatus, TradingRange};

#[derive(Debug, Clone)]
pub struct RangeDetectorConfig {
    pub pivot_lookback: usize,
    pub cluster_tolerance: Decimal,
    pub min_touches: usize,
    /// Ranges scoring below this floor are discarded before construction.
    pub min_quality_score: Decimal,
    /// Relative tolerance used when counting a later bar as "retesting" a
    /// level rather than merely approaching it.
    pub retest_tolerance: Decimal,
}

impl Default for RangeDetectorConfig {
    fn default() -> Self {
        Self {
            pivot_lookback: 2,
            cluster_tolerance: dec!(0.015),
            min_touches: 2,
            min_quality_score: dec!(60),
            retest_tolerance: dec!(0.005),
        }
    }
}

pub struct RangeDetector {
    config: RangeDetectorConfig,
}

impl RangeDetector {
    pub fn new(config: RangeDetectorConfig) -> Self {
        Self { config }
    }

    /// Runs the full pipeline over one symbol/timeframe's bar history and
    /// returns at most one `TradingRange` — the most recent one found, since
    /// a single instrument has one active accumulation range at a time in
    /// this model.
    pub fn detect_range(&self, bars: &[OhlcvBar]) -> Result<Option<TradingRange>, RangesError> {
        validate_bar_sequence(bars).map_err(|e| RangesError::InvalidSequence(e.to_string()))?;
        if bars.len() < self.config.pivot_lookback * 2 + 1 {
            return Ok(None);
        }

        let pivots = detect_pivots(bars, self.config.pivot_lookback);
        let highs: Vec<_> = pivots.iter().cloned().filter(|p| p.kind == PivotKind::High).collect();
        let lows: Vec<_> = pivots.iter().cloned().filter(|p| p.kind == PivotKind::Low).collect();

        let resistance = cluster_pivots(&highs, self.config.cluster_tolerance, self.config.min_touches);
        let support = cluster_pivots(&lows, self.config.cluster_tolerance, self.config.min_touches);

        let Some((creek, ice)) = compute_creek_ice(&support, &resistance) else {
            return Ok(None);
        };

        let quality_score = score_quality(&creek, &ice);
        if quality_score < self.config.min_quality_score {
            return Ok(None);
        }

        let start_index = creek.provenance.iter().chain(ice.provenance.iter()).min().copied().unwrap_or(0);
        let end_index = bars.len() - 1;
        let duration = end_index.saturating_sub(start_index);
        if !(15..=100).contains(&duration) {
            return Ok(None);
        }

        let jump = compute_jump(&creek, &ice);
        let cause_factor = estimate_cause_factor(&creek, &ice);

        let touch_count_support = count_retests(bars, creek.price, self.config.retest_tolerance, true);
        let touch_count_resistance = count_retests(bars, ice.price, self.config.retest_tolerance, false);

        let status = if bars[end_index].close > ice.price {
            RangeStatus::Breakout
        } else if bars[end_index].close < creek.price {
            RangeStatus::Failed
        } else {
            RangeStatus::Active
        };

        let range = TradingRange {
            id: Uuid::new_v4(),
            symbol: bars[0].symbol.clone(),
            timeframe: bars[0].timeframe,
            start_timestamp: bars[start_index].timestamp,
            end_timestamp: bars[end_index].timestamp,
            start_index,
            end_index,
            support: creek.price,
            resistance: ice.price,
            touch_count_support,
            touch_count_resistance,
            quality_score,
            status,
            cause_factor,
            phase: WyckoffPhase::A,
            creek: Some(creek),
            ice: Some(ice),
            jump: Some(jump),
            deleted: false,
        };
        Ok(Some(range))
    }
}

/// Counts bars (after the level's own provenance) whose low (for support)
/// or high (for resistance) comes within `tolerance` of the level without
/// breaching it meaningfully.
fn count_retests(bars: &[OhlcvBar], level: Decimal, tolerance: Decimal, is_support: bool) -> u32 {
    let mut count = 0u32;
    for bar in bars {
        let price = if is_support { bar.low } else { bar.high };
        if level <= Decimal::ZERO {
            continue;
        }
        let diff = ((price - level) / level).abs();
        if diff <= tolerance {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn make_ranging_bars() -> Vec<OhlcvBar> {
        let mut bars = Vec::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // Oscillate between ~90 support and ~110 resistance for 40 bars.
        let pattern = [100, 95, 91, 95, 100, 105, 109, 105, 100, 95, 91, 95, 100, 105, 109, 105];
        for i in 0..40 {
            let p = pattern[i % pattern.len()];
            let price = Decimal::from(p);
            bars.push(OhlcvBar {
                symbol: "TEST".into(),
                timeframe: Timeframe::D1,
                timestamp: base + chrono::Duration::days(i as i64),
                open: price,
                high: price + dec!(1),
                low: price - dec!(1),
                close: price,
                volume: 1_000_000,
            });
        }
        bars
    }

    #[test]
    fn detects_a_range_from_oscillating_bars() {
        let bars = make_ranging_bars();
        let detector = RangeDetector::new(RangeDetectorConfig::default());
        let range = detector.detect_range(&bars).unwrap();
        assert!(range.is_some());
        let range = range.unwrap();
        assert!(range.support < range.resistance);
        assert!(range.validate().is_ok());
    }
}
