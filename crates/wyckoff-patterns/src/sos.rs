//! `detect_sign_of_strength`: the demand-driven breakout through Ice
//! (spec.md §4.D).

use crate::error::PatternsError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::pattern::SignOfStrength;

/// Scans from `start_index` for the first bar breaking out through `ice`
/// with breakout_pct >= 1%, volume_ratio >= 1.5, spread_ratio >= 1.2, and
/// close_position >= 0.5.
pub fn detect_sign_of_strength(
    bars: &[OhlcvBar],
    ice: Decimal,
    volume_ratios: &[Option<Decimal>],
    spread_ratios: &[Option<Decimal>],
    start_index: usize,
) -> Result<Option<SignOfStrength>, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if volume_ratios.len() != bars.len() || spread_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "sign_of_strength",
            message: "volume_ratios/spread_ratios must be index-aligned to bars".into(),
        });
    }
    if ice <= Decimal::ZERO {
        return Ok(None);
    }

    for i in start_index..bars.len() {
        let bar = &bars[i];
        if bar.close <= ice {
            continue;
        }
        let breakout_pct = (bar.close - ice) / ice;
        if breakout_pct < dec!(0.01) {
            continue;
        }
        let Some(volume_ratio) = volume_ratios[i] else { continue };
        if volume_ratio < dec!(1.5) {
            continue;
        }
        let Some(spread_ratio) = spread_ratios[i] else { continue };
        if spread_ratio < dec!(1.2) {
            continue;
        }
        let close_position = bar.close_position();
        if close_position < dec!(0.5) {
            continue;
        }

        let confidence = estimate_confidence(breakout_pct, volume_ratio, spread_ratio, close_position);

        return Ok(Some(SignOfStrength {
            bar_index: i,
            timestamp: bar.timestamp,
            breakout_pct,
            volume_ratio,
            spread_ratio,
            close_position,
            breakout_price: bar.close,
            confidence,
        }));
    }

    Ok(None)
}

/// A detector-local estimate used before the asset-class scorer refines it;
/// the campaign detector re-scores via `ConfidenceScorer::calculate_sos_confidence`.
fn estimate_confidence(breakout_pct: Decimal, volume_ratio: Decimal, spread_ratio: Decimal, close_position: Decimal) -> u8 {
    use rust_decimal::prelude::ToPrimitive;
    let base = dec!(50);
    let breakout_bonus = (breakout_pct / dec!(0.01) * dec!(10)).min(dec!(20));
    let volume_bonus = (volume_ratio - dec!(1.5)).max(Decimal::ZERO) * dec!(10);
    let spread_bonus = (spread_ratio - dec!(1.2)) * dec!(10);
    let close_bonus = close_position * dec!(10);
    (base + breakout_bonus + volume_bonus + spread_bonus + close_bonus)
        .min(Decimal::from(100))
        .to_u8()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn bar(close: Decimal, ts_day: i64) -> OhlcvBar {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: base + chrono::Duration::days(ts_day),
            open: close - dec!(1),
            high: close + dec!(0.5),
            low: close - dec!(2),
            close,
            volume: 2_000_000,
        }
    }

    #[test]
    fn detects_breakout_meeting_all_thresholds() {
        let bars: Vec<_> = (0..5).map(|i| bar(dec!(110) + Decimal::from(i), i as i64)).collect();
        let ratios: Vec<_> = bars.iter().map(|_| Some(dec!(2.0))).collect();
        let spreads: Vec<_> = bars.iter().map(|_| Some(dec!(1.5))).collect();
        let sos = detect_sign_of_strength(&bars, dec!(105), &ratios, &spreads, 0).unwrap();
        assert!(sos.is_some());
    }
}
