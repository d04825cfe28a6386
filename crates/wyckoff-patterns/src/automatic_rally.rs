//! `detect_automatic_rally`: the rebound out of a Selling Climax
//! (spec.md §4.D).

use crate::error::PatternsError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::pattern::{AutomaticRally, SellingClimaxEvidence, VolumeProfile};

/// Searches `(sc.bar_index, sc.bar_index + 10]` for the highest high,
/// reporting it as the Automatic Rally if the rally clears 3%.
pub fn detect_automatic_rally(
    bars: &[OhlcvBar],
    sc: &SellingClimaxEvidence,
    volume_ratios: &[Option<Decimal>],
) -> Result<Option<AutomaticRally>, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if volume_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "automatic_rally",
            message: "volume_ratios must be index-aligned to bars".into(),
        });
    }

    let window_end = bars.len().min(sc.bar_index + 11);
    if sc.bar_index + 1 >= window_end {
        return Ok(None);
    }
    let window = &bars[sc.bar_index + 1..window_end];

    let Some((offset, ar_bar)) = window
        .iter()
        .enumerate()
        .max_by_key(|(_, b)| b.high)
    else {
        return Ok(None);
    };

    let rally_pct = (ar_bar.high - sc.low) / sc.low;
    if rally_pct < dec!(0.03) {
        return Ok(None);
    }

    let bars_after_sc = (offset + 1) as u8;
    let ar_index = sc.bar_index + 1 + offset;
    let volume_ratio = volume_ratios[ar_index].unwrap_or(Decimal::ONE);
    let volume_profile = if volume_ratio >= dec!(1.2) {
        VolumeProfile::High
    } else {
        VolumeProfile::Normal
    };

    // Quality rewards a prompt rally (within 5 bars) and clearing the 3%
    // floor comfortably, each contributing up to half of [0, 1].
    let timing_component = if bars_after_sc <= 5 { dec!(0.5) } else { dec!(0.3) };
    let strength_component = (rally_pct / dec!(0.03) * dec!(0.5)).min(dec!(0.5));
    let quality_score = (timing_component + strength_component).min(Decimal::ONE);

    Ok(Some(AutomaticRally {
        bar_index: ar_index,
        timestamp: ar_bar.timestamp,
        rally_pct,
        bars_after_sc,
        sc_reference: sc.bar_index,
        sc_low: sc.low,
        ar_high: ar_bar.high,
        volume_profile,
        quality_score,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn bars_with_rally() -> (Vec<OhlcvBar>, SellingClimaxEvidence) {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prices = [100, 90, 91, 92, 95, 98, 93, 92, 91, 90, 89, 88];
        let bars: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let price = Decimal::from(p);
                OhlcvBar {
                    symbol: "TEST".into(),
                    timeframe: Timeframe::D1,
                    timestamp: base + chrono::Duration::days(i as i64),
                    open: price,
                    high: price + dec!(1),
                    low: price - dec!(1),
                    close: price,
                    volume: 1_000_000,
                }
            })
            .collect();
        let sc = SellingClimaxEvidence {
            bar_index: 1,
            timestamp: bars[1].timestamp,
            low: bars[1].low,
            volume_ratio: dec!(2.5),
            confidence: 80,
        };
        (bars, sc)
    }

    #[test]
    fn finds_rally_clearing_three_percent() {
        let (bars, sc) = bars_with_rally();
        let ratios: Vec<_> = bars.iter().map(|_| Some(dec!(1.0))).collect();
        let ar = detect_automatic_rally(&bars, &sc, &ratios).unwrap().unwrap();
        assert!(ar.rally_pct >= dec!(0.03));
        assert!(ar.bars_after_sc <= 10);
    }
}
