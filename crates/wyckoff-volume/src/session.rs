//! `SessionRelativeVolumeAnalyzer`: for intraday timeframes (<=1h), replace
//! the global 20-bar baseline with a per-session rolling baseline — volume
//! during the thin Asian session is not compared against the London open
//! (spec.md §4.A).

use crate::analyzer::{classify_effort_result, VolumeAnalysis, ROLLING_WINDOW};
use crate::error::VolumeError;
use rust_decimal::Decimal;
use std::collections::HashMap;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::time::ForexSession;

fn rolling_mean_decimal(values: &[Decimal], end_inclusive: usize, window: usize) -> Option<Decimal> {
    if end_inclusive + 1 < window {
        return None;
    }
    let start = end_inclusive + 1 - window;
    let slice = &values[start..=end_inclusive];
    let sum: Decimal = slice.iter().copied().sum();
    Some(sum / Decimal::from(window))
}

/// Computes `VolumeAnalysis` per bar using a baseline built only from prior
/// bars in the same session, instead of the flat global rolling mean.
/// Intended for intraday timeframes; callers should check
/// `Timeframe::is_intraday` before using this over `analyze_volume`.
pub fn analyze_session_relative_volume(
    bars: &[OhlcvBar],
) -> Result<Vec<VolumeAnalysis>, VolumeError> {
    validate_bar_sequence(bars).map_err(|e| VolumeError::InvalidSequence(e.to_string()))?;

    let sessions: Vec<ForexSession> = bars.iter().map(|b| ForexSession::from_timestamp(b.timestamp)).collect();

    // Per-session ordered lists of (global_index, volume, spread).
    let mut per_session: HashMap<ForexSession, Vec<(usize, Decimal, Decimal)>> = HashMap::new();
    for (i, bar) in bars.iter().enumerate() {
        per_session
            .entry(sessions[i])
            .or_default()
            .push((i, Decimal::from(bar.volume), bar.spread()));
    }

    let mut results: Vec<VolumeAnalysis> = vec![
        VolumeAnalysis {
            bar_index: 0,
            volume_ratio: None,
            spread_ratio: None,
            close_position: Decimal::ZERO,
            effort_result: None,
        };
        bars.len()
    ];

    for entries in per_session.values() {
        let volumes: Vec<Decimal> = entries.iter().map(|(_, v, _)| *v).collect();
        let spreads: Vec<Decimal> = entries.iter().map(|(_, _, s)| *s).collect();

        for (pos, &(global_idx, _, _)) in entries.iter().enumerate() {
            let volume_mean = rolling_mean_decimal(&volumes, pos, ROLLING_WINDOW);
            let spread_mean = rolling_mean_decimal(&spreads, pos, ROLLING_WINDOW);

            let volume_ratio = volume_mean.and_then(|mean| {
                if mean > Decimal::ZERO {
                    Some(volumes[pos] / mean)
                } else {
                    None
                }
            });
            let spread_ratio = spread_mean.and_then(|mean| {
                if mean > Decimal::ZERO {
                    Some(spreads[pos] / mean)
                } else {
                    None
                }
            });
            let effort_result = match (volume_ratio, spread_ratio) {
                (Some(vr), Some(sr)) => Some(classify_effort_result(vr, sr)),
                _ => None,
            };

            results[global_idx] = VolumeAnalysis {
                bar_index: global_idx,
                volume_ratio,
                spread_ratio,
                close_position: bars[global_idx].close_position(),
                effort_result,
            };
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use wyckoff_core::time::Timeframe;

    fn bar(hour: u32, day_offset: i64, volume: i64) -> OhlcvBar {
        OhlcvBar {
            symbol: "EURUSD".into(),
            timeframe: Timeframe::M15,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
                + chrono::Duration::days(day_offset),
            open: dec!(1.1),
            high: dec!(1.101),
            low: dec!(1.099),
            close: dec!(1.1005),
            volume,
        }
    }

    #[test]
    fn baseline_is_scoped_to_session() {
        // 20 Asian-session bars (hour 3), all equal volume, then an
        // Asian-session bar with double volume should ratio 2.0 even
        // though interleaved London bars have much higher volume.
        let mut bars = Vec::new();
        for d in 0..20 {
            bars.push(bar(3, d, 100_000)); // asian
            bars.push(bar(8, d, 5_000_000)); // london, far higher volume
        }
        bars.push(bar(3, 20, 200_000)); // asian spike

        let analysis = analyze_session_relative_volume(&bars).unwrap();
        let asian_spike = &analysis[bars.len() - 1];
        assert_eq!(asian_spike.volume_ratio, Some(dec!(2)));
    }
}
