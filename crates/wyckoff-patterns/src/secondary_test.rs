//! `detect_secondary_test`: confirms support held after the Automatic
//! Rally, numbered in detection order (spec.md §4.D).

use crate::error::PatternsError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::pattern::{AutomaticRally, SecondaryTest, SellingClimaxEvidence};

struct Candidate<'a> {
    bar: &'a OhlcvBar,
    index: usize,
    distance: Decimal,
    volume_reduction: Decimal,
    penetration: Decimal,
    test_volume_ratio: Decimal,
}

/// Searches `(ar.bar_index, ar.bar_index + 40]` for the best Secondary
/// Test. `existing_test_count` numbers this test among those already found
/// for the range (1-indexed).
pub fn detect_secondary_test(
    bars: &[OhlcvBar],
    sc: &SellingClimaxEvidence,
    ar: &AutomaticRally,
    volume_ratios: &[Option<Decimal>],
    existing_test_count: u32,
) -> Result<Option<SecondaryTest>, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if volume_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "secondary_test",
            message: "volume_ratios must be index-aligned to bars".into(),
        });
    }
    if sc.low <= Decimal::ZERO {
        return Ok(None);
    }

    let window_start = ar.bar_index + 1;
    let window_end = bars.len().min(ar.bar_index + 41);
    if window_start >= window_end {
        return Ok(None);
    }

    let mut best: Option<Candidate> = None;
    for i in window_start..window_end {
        let bar = &bars[i];
        let distance = ((bar.low - sc.low) / sc.low).abs();
        if distance > dec!(0.02) {
            continue;
        }
        let penetration = if bar.low < sc.low {
            (sc.low - bar.low) / sc.low
        } else {
            Decimal::ZERO
        };
        if penetration > dec!(0.01) {
            continue;
        }
        let Some(test_volume_ratio) = volume_ratios[i] else {
            continue;
        };
        if sc.volume_ratio <= Decimal::ZERO {
            continue;
        }
        let volume_reduction = (sc.volume_ratio - test_volume_ratio) / sc.volume_ratio;
        if volume_reduction < dec!(0.20) {
            continue;
        }

        let candidate = Candidate {
            bar,
            index: i,
            distance,
            volume_reduction,
            penetration,
            test_volume_ratio,
        };

        best = Some(match best {
            None => candidate,
            Some(current) => pick_better(current, candidate),
        });
    }

    let Some(best) = best else {
        return Ok(None);
    };

    let volume_component = (best.volume_reduction / dec!(0.20) * dec!(22.5)).min(dec!(45));
    let proximity_component = ((dec!(0.02) - best.distance) / dec!(0.02) * dec!(27)).max(Decimal::ZERO);
    let holding_component = if best.penetration <= Decimal::ZERO { dec!(18) } else { dec!(9) };
    let close_position = best.bar.close_position();
    let close_position_component = close_position * dec!(10);
    let spread_bonus = if best.bar.spread() > Decimal::ZERO { dec!(5) } else { Decimal::ZERO };

    let confidence_decimal =
        (volume_component + proximity_component + holding_component + close_position_component + spread_bonus)
            .min(Decimal::from(100));
    let confidence = confidence_decimal.to_u8().unwrap_or(0);

    Ok(Some(SecondaryTest {
        bar_index: best.index,
        timestamp: best.bar.timestamp,
        distance_from_sc_low: best.distance,
        volume_reduction_pct: best.volume_reduction,
        test_number: existing_test_count + 1,
        penetration: best.penetration,
        confidence,
    }))
}

/// Tie-break order: lowest volume, then closest proximity, then earliest.
fn pick_better<'a>(current: Candidate<'a>, challenger: Candidate<'a>) -> Candidate<'a> {
    if challenger.test_volume_ratio < current.test_volume_ratio {
        return challenger;
    }
    if challenger.test_volume_ratio > current.test_volume_ratio {
        return current;
    }
    if challenger.distance < current.distance {
        return challenger;
    }
    if challenger.distance > current.distance {
        return current;
    }
    if challenger.index < current.index {
        challenger
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn bar(price: Decimal, close: Decimal, volume: i64, ts_day: i64) -> OhlcvBar {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: base + chrono::Duration::days(ts_day),
            open: price,
            high: price + dec!(1),
            low: price,
            close,
            volume,
        }
    }

    #[test]
    fn finds_test_with_volume_reduction() {
        let sc = SellingClimaxEvidence {
            bar_index: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            low: dec!(90),
            volume_ratio: dec!(2.5),
            confidence: 80,
        };
        let ar = AutomaticRally {
            bar_index: 5,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap(),
            rally_pct: dec!(0.05),
            bars_after_sc: 4,
            sc_reference: 1,
            sc_low: dec!(90),
            ar_high: dec!(95),
            volume_profile: wyckoff_core::pattern::VolumeProfile::Normal,
            quality_score: dec!(0.8),
        };
        let mut bars = vec![bar(dec!(90), dec!(91), 1_000_000, 0); 6];
        bars.push(bar(dec!(90.5), dec!(91), 600_000, 6)); // volume_reduction from 2.5 ratio -> 0.6 ratio = 0.76 reduction
        let ratios: Vec<_> = bars.iter().enumerate().map(|(i, _)| if i == 6 { Some(dec!(0.6)) } else { Some(dec!(1.0)) }).collect();
        let st = detect_secondary_test(&bars, &sc, &ar, &ratios, 0).unwrap().unwrap();
        assert_eq!(st.test_number, 1);
        assert!(st.volume_reduction_pct >= dec!(0.20));
    }
}
