//! `detect_last_point_of_support`: the post-SOS pullback that holds
//! support on diminished volume (spec.md §4.D).

use crate::error::PatternsError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::pattern::{LastPointOfSupport, SignOfStrength};

/// Scans bars after `sos.bar_index` for a pullback toward Ice that holds
/// (low stays at or above Ice) on volume lower than the SOS breakout bar.
pub fn detect_last_point_of_support(
    bars: &[OhlcvBar],
    sos: &SignOfStrength,
    ice: Decimal,
    volume_ratios: &[Option<Decimal>],
) -> Result<Option<LastPointOfSupport>, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if volume_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "last_point_of_support",
            message: "volume_ratios must be index-aligned to bars".into(),
        });
    }
    if ice <= Decimal::ZERO {
        return Ok(None);
    }

    for i in (sos.bar_index + 1)..bars.len() {
        let bar = &bars[i];
        let Some(volume_ratio) = volume_ratios[i] else { continue };
        if volume_ratio >= sos.volume_ratio {
            continue;
        }
        let distance_from_ice = (bar.low - ice) / ice;
        // Only a pullback that comes back near Ice (within 3%) qualifies.
        if distance_from_ice.abs() > dec!(0.03) {
            continue;
        }
        let held_support = bar.low >= ice;
        if !held_support {
            continue;
        }

        let confidence = estimate_confidence(distance_from_ice, volume_ratio, sos.volume_ratio);

        return Ok(Some(LastPointOfSupport {
            bar_index: i,
            timestamp: bar.timestamp,
            distance_from_ice,
            held_support,
            volume_ratio,
            ice_level: ice,
            confidence,
        }));
    }

    Ok(None)
}

fn estimate_confidence(distance_from_ice: Decimal, volume_ratio: Decimal, sos_volume_ratio: Decimal) -> u8 {
    let base = dec!(60);
    let proximity_bonus = ((dec!(0.03) - distance_from_ice.abs()) / dec!(0.03) * dec!(20)).max(Decimal::ZERO);
    let volume_drop = sos_volume_ratio - volume_ratio;
    let volume_bonus = (volume_drop * dec!(10)).max(Decimal::ZERO).min(dec!(20));
    (base + proximity_bonus + volume_bonus).min(Decimal::from(100)).to_u8().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn bar(close: Decimal, low: Decimal, ts_day: i64) -> OhlcvBar {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: base + chrono::Duration::days(ts_day),
            open: close,
            high: close + dec!(1),
            low,
            close,
            volume: 800_000,
        }
    }

    #[test]
    fn detects_a_holding_pullback() {
        let sos = SignOfStrength {
            bar_index: 2,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            breakout_pct: dec!(0.02),
            volume_ratio: dec!(2.0),
            spread_ratio: dec!(1.3),
            close_position: dec!(0.9),
            breakout_price: dec!(112),
            confidence: 75,
        };
        let bars: Vec<_> = vec![
            bar(dec!(112), dec!(111), 0),
            bar(dec!(113), dec!(112), 1),
            bar(dec!(112), dec!(110), 2),
            bar(dec!(110.5), dec!(109.7), 3),
        ];
        let ratios: Vec<_> = bars.iter().map(|_| Some(dec!(0.9))).collect();
        let lps = detect_last_point_of_support(&bars, &sos, dec!(110), &ratios).unwrap();
        assert!(lps.is_some());
        assert!(lps.unwrap().held_support);
    }
}
