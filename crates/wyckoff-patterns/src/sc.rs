//! `detect_selling_climax`: anchors Phase A. Not itself a `Pattern`
//! variant, but required context for Automatic Rally and Secondary Test
//! (spec.md §4.D).

use crate::error::PatternsError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::pattern::SellingClimaxEvidence;
use wyckoff_volume::analyzer::{classify_effort_result, EffortResult};

/// Scans for the first bar whose volume/spread pair classifies as
/// `EffortResult::Climactic`, closes in the upper half of its own range
/// (absorption), and closes below the prior bar's close (downward
/// movement). A climactic up-bar is a buying climax, not a selling one,
/// and is not reported here.
pub fn detect_selling_climax(
    bars: &[OhlcvBar],
    volume_ratios: &[Option<Decimal>],
    spread_ratios: &[Option<Decimal>],
) -> Result<Option<SellingClimaxEvidence>, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if volume_ratios.len() != bars.len() || spread_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "selling_climax",
            message: "volume_ratios/spread_ratios must be index-aligned to bars".into(),
        });
    }

    for i in 1..bars.len() {
        let bar = &bars[i];
        let prior = &bars[i - 1];
        let Some(volume_ratio) = volume_ratios[i] else { continue };
        let Some(spread_ratio) = spread_ratios[i] else { continue };
        if classify_effort_result(volume_ratio, spread_ratio) != EffortResult::Climactic {
            continue;
        }

        let close_position = bar.close_position();
        if close_position < dec!(0.5) {
            continue;
        }
        if bar.close >= prior.close {
            continue;
        }

        let confidence = sc_confidence(volume_ratio, spread_ratio, close_position);
        return Ok(Some(SellingClimaxEvidence {
            bar_index: i,
            timestamp: bar.timestamp,
            low: bar.low,
            volume_ratio,
            confidence,
        }));
    }

    Ok(None)
}

/// Tiered confidence: volume strength (40pts), spread width (30pts), close
/// position (30pts). Inputs are assumed to already satisfy the SC gates
/// (volume_ratio >= 2.0, spread_ratio >= 1.5, close_position >= 0.5).
fn sc_confidence(volume_ratio: Decimal, spread_ratio: Decimal, close_position: Decimal) -> u8 {
    let volume_pts = if volume_ratio >= dec!(3.0) {
        40
    } else if volume_ratio >= dec!(2.5) {
        35
    } else {
        30
    };

    let spread_pts = if spread_ratio >= dec!(2.0) {
        30
    } else if spread_ratio >= dec!(1.8) {
        25
    } else {
        20
    };

    let close_pts = if close_position >= dec!(0.9) {
        30
    } else if close_position >= dec!(0.8) {
        25
    } else if close_position >= dec!(0.7) {
        20
    } else if close_position >= dec!(0.6) {
        15
    } else {
        10
    };

    (volume_pts + spread_pts + close_pts).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn bar(day: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal, volume: i64) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn detects_a_climactic_bar_closing_high_below_prior_close() {
        let mut bars: Vec<OhlcvBar> = (0..20).map(|i| bar(i, dec!(100), dec!(101), dec!(99), dec!(100), 1_000_000)).collect();
        // close near the top of its own range (absorption), but below the prior close.
        bars.push(bar(20, dec!(95), dec!(96), dec!(85), dec!(95), 3_000_000));
        let mut volume_ratios = vec![None; bars.len()];
        let mut spread_ratios = vec![None; bars.len()];
        volume_ratios[20] = Some(dec!(3.0));
        spread_ratios[20] = Some(dec!(6.5));

        let result = detect_selling_climax(&bars, &volume_ratios, &spread_ratios).unwrap();
        let sc = result.expect("selling climax expected");
        assert_eq!(sc.bar_index, 20);
        assert_eq!(sc.low, dec!(85));
        assert_eq!(sc.confidence, 100);
    }

    #[test]
    fn close_at_or_above_prior_close_is_not_a_selling_climax() {
        let mut bars: Vec<OhlcvBar> = (0..20).map(|i| bar(i, dec!(100), dec!(101), dec!(99), dec!(100), 1_000_000)).collect();
        // close position is high (absorption-like) but closes above the prior bar's close.
        bars.push(bar(20, dec!(85), dec!(110), dec!(84), dec!(105), 3_000_000));
        let mut volume_ratios = vec![None; bars.len()];
        let mut spread_ratios = vec![None; bars.len()];
        volume_ratios[20] = Some(dec!(3.0));
        spread_ratios[20] = Some(dec!(6.5));

        let result = detect_selling_climax(&bars, &volume_ratios, &spread_ratios).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn low_close_position_is_not_a_selling_climax() {
        let mut bars: Vec<OhlcvBar> = (0..20).map(|i| bar(i, dec!(100), dec!(101), dec!(99), dec!(100), 1_000_000)).collect();
        // closes near the low of its own range: no absorption, fails close_position gate.
        bars.push(bar(20, dec!(95), dec!(96), dec!(85), dec!(86), 3_000_000));
        let mut volume_ratios = vec![None; bars.len()];
        let mut spread_ratios = vec![None; bars.len()];
        volume_ratios[20] = Some(dec!(3.0));
        spread_ratios[20] = Some(dec!(6.5));

        let result = detect_selling_climax(&bars, &volume_ratios, &spread_ratios).unwrap();
        assert!(result.is_none());
    }
}
