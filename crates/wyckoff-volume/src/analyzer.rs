//! Component A: the Volume Analyzer (spec.md §4.A).

use crate::error::VolumeError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};

/// The rolling window used for the flat (non session-relative) baseline.
pub const ROLLING_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortResult {
    Normal,
    Climactic,
    EffortNoResult,
    ResultNoEffort,
}

/// Classifies a bar's effort (volume) against its result (spread), per the
/// thresholds in spec.md §4.A.
pub fn classify_effort_result(volume_ratio: Decimal, spread_ratio: Decimal) -> EffortResult {
    if volume_ratio >= dec!(2.0) && spread_ratio >= dec!(1.5) {
        EffortResult::Climactic
    } else if volume_ratio >= dec!(1.5) && spread_ratio <= dec!(0.8) {
        EffortResult::EffortNoResult
    } else if volume_ratio <= dec!(0.8) && spread_ratio >= dec!(1.5) {
        EffortResult::ResultNoEffort
    } else {
        EffortResult::Normal
    }
}

/// Per-bar volume analysis, index-aligned to the input bar slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub bar_index: usize,
    /// `None` for the first 19 bars (insufficient window).
    pub volume_ratio: Option<Decimal>,
    pub spread_ratio: Option<Decimal>,
    pub close_position: Decimal,
    pub effort_result: Option<EffortResult>,
}

fn rolling_mean_decimal(values: &[Decimal], end_inclusive: usize, window: usize) -> Option<Decimal> {
    if end_inclusive + 1 < window {
        return None;
    }
    let start = end_inclusive + 1 - window;
    let slice = &values[start..=end_inclusive];
    let sum: Decimal = slice.iter().copied().sum();
    Some(sum / Decimal::from(window))
}

/// Computes a `VolumeAnalysis` for every bar in the slice. Bars must be
/// chronologically ordered and share one symbol/timeframe (spec.md §4.A).
pub fn analyze_volume(bars: &[OhlcvBar]) -> Result<Vec<VolumeAnalysis>, VolumeError> {
    validate_bar_sequence(bars).map_err(|e| VolumeError::InvalidSequence(e.to_string()))?;

    let volumes: Vec<Decimal> = bars.iter().map(|b| Decimal::from(b.volume)).collect();
    let spreads: Vec<Decimal> = bars.iter().map(|b| b.spread()).collect();

    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let volume_mean = rolling_mean_decimal(&volumes, i, ROLLING_WINDOW);
        let spread_mean = rolling_mean_decimal(&spreads, i, ROLLING_WINDOW);

        let volume_ratio = volume_mean.and_then(|mean| {
            if mean > Decimal::ZERO {
                Some(volumes[i] / mean)
            } else {
                None
            }
        });
        let spread_ratio = spread_mean.and_then(|mean| {
            if mean > Decimal::ZERO {
                Some(spreads[i] / mean)
            } else {
                None
            }
        });

        let effort_result = match (volume_ratio, spread_ratio) {
            (Some(vr), Some(sr)) => Some(classify_effort_result(vr, sr)),
            _ => None,
        };

        out.push(VolumeAnalysis {
            bar_index: i,
            volume_ratio,
            spread_ratio,
            close_position: bar.close_position(),
            effort_result,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn make_bars(volumes: &[i64]) -> Vec<OhlcvBar> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| OhlcvBar {
                symbol: "TEST".into(),
                timeframe: Timeframe::D1,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64),
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100.5),
                volume: v,
            })
            .collect()
    }

    #[test]
    fn first_19_bars_have_null_ratios() {
        let bars = make_bars(&[1_000_000; 30]);
        let analysis = analyze_volume(&bars).unwrap();
        for a in &analysis[0..19] {
            assert!(a.volume_ratio.is_none());
            assert!(a.spread_ratio.is_none());
        }
        assert!(analysis[19].volume_ratio.is_some());
    }

    #[test]
    fn volume_ratio_matches_rolling_mean_definition() {
        let mut volumes = vec![1_000_000; 19];
        volumes.push(2_200_000); // index 19, ratio should be 2.2
        let bars = make_bars(&volumes);
        let analysis = analyze_volume(&bars).unwrap();
        assert_eq!(analysis[19].volume_ratio, Some(dec!(2.2)));
    }

    #[test]
    fn classification_climactic() {
        assert_eq!(
            classify_effort_result(dec!(2.5), dec!(1.6)),
            EffortResult::Climactic
        );
    }

    #[test]
    fn classification_effort_no_result() {
        assert_eq!(
            classify_effort_result(dec!(1.6), dec!(0.5)),
            EffortResult::EffortNoResult
        );
    }

    #[test]
    fn classification_result_no_effort() {
        assert_eq!(
            classify_effort_result(dec!(0.5), dec!(1.6)),
            EffortResult::ResultNoEffort
        );
    }

    #[test]
    fn classification_normal() {
        assert_eq!(
            classify_effort_result(dec!(1.0), dec!(1.0)),
            EffortResult::Normal
        );
    }
}
