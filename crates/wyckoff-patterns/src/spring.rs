//! `detect_spring`: the Phase C reaccumulation test (spec.md §4.D).

use crate::error::PatternsError;
use crate::scoring::{ConfidenceScorer, SpringScoreInputs};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_config::DetectionConfig;
use wyckoff_core::bar::{validate_bar_sequence, OhlcvBar};
use wyckoff_core::levels::CreekLevel;
use wyckoff_core::pattern::{Spring, VolumeReliability};
use wyckoff_core::phase::WyckoffPhase;
use wyckoff_core::time::ForexSession;
use tracing::debug;

pub enum SpringOutcome {
    /// No candidate bar satisfied the detection rules.
    None,
    Detected(Spring),
    /// A breakdown of >=5% below Creek followed the candidate within 10
    /// bars: the range itself is invalidated, not merely this pattern.
    RangeInvalidated { bar_index: usize },
}

/// Session confidence penalty, applied only when
/// `session_confidence_scoring_enabled`. Asian carries a harsher penalty
/// when the session filter is also active, since a filtered-but-scored
/// Asian spring is doubly suspect.
fn session_penalty(session: ForexSession, filtering_enabled: bool) -> i16 {
    match session {
        ForexSession::London | ForexSession::Overlap => 0,
        ForexSession::NewYork => -5,
        ForexSession::Asian => {
            if filtering_enabled {
                -25
            } else {
                -20
            }
        }
        ForexSession::NewYorkClose => -25,
    }
}

/// `volume_ratios` must be index-aligned to `bars` (rolling-20 or
/// session-relative, per spec.md §4.A — the caller picks based on
/// timeframe). Scans from index 20 onward for the first valid Spring.
pub fn detect_spring(
    bars: &[OhlcvBar],
    phase: WyckoffPhase,
    creek: &CreekLevel,
    volume_ratios: &[Option<Decimal>],
    config: &DetectionConfig,
    scorer: &dyn ConfidenceScorer,
    prior_test_volumes_declining: bool,
) -> Result<SpringOutcome, PatternsError> {
    validate_bar_sequence(bars).map_err(|e| PatternsError::InvalidSequence(e.to_string()))?;
    if phase != WyckoffPhase::C {
        return Ok(SpringOutcome::None);
    }
    if volume_ratios.len() != bars.len() {
        return Err(PatternsError::MissingContext {
            detector: "spring",
            message: "volume_ratios must be index-aligned to bars".into(),
        });
    }

    for i in 20..bars.len() {
        let bar = &bars[i];
        if bar.low >= creek.price {
            continue;
        }
        let penetration_pct = (creek.price - bar.low) / creek.price;
        if penetration_pct > dec!(0.05) {
            continue;
        }

        let Some(volume_ratio) = volume_ratios[i] else {
            continue;
        };
        if volume_ratio >= dec!(0.7) {
            continue;
        }

        let recovery = bars[i + 1..bars.len().min(i + 6)]
            .iter()
            .enumerate()
            .find(|(_, b)| b.close > creek.price);
        let Some((offset, recovery_bar)) = recovery else {
            continue;
        };
        let recovery_bars = (offset + 1) as u8;

        let timeframe_eligible = bar.timeframe.is_intraday();
        let session = if timeframe_eligible
            && (config.session_filter_enabled || config.session_confidence_scoring_enabled)
        {
            Some(ForexSession::from_timestamp(bar.timestamp))
        } else {
            None
        };

        let mut rejected_by_session_filter = false;
        let mut rejection_reason = None;
        let mut rejection_timestamp = None;
        if let Some(s) = session {
            if config.session_filter_enabled && matches!(s, ForexSession::Asian | ForexSession::NewYorkClose) {
                rejected_by_session_filter = true;
                rejection_reason = Some(format!("{:?} session excluded by session filter", s));
                rejection_timestamp = Some(bar.timestamp);
                debug!(session = ?s, bar_index = i, "spring candidate rejected by session filter");
                if !config.store_rejected_patterns {
                    continue;
                }
            }
        }

        let session_confidence_penalty = if config.session_confidence_scoring_enabled {
            session.map(|s| session_penalty(s, config.session_filter_enabled))
        } else {
            None
        };

        let creek_strength = creek.strength;
        let base_confidence = scorer.calculate_spring_confidence(SpringScoreInputs {
            volume_ratio,
            penetration_pct,
            recovery_bars,
            test_confirmed: prior_test_volumes_declining,
            creek_strength,
            volume_trend_declining: prior_test_volumes_declining,
        });

        let penalized = base_confidence as i16 + session_confidence_penalty.unwrap_or(0);
        let is_tradeable = !rejected_by_session_filter && penalized >= 70;

        // Breakdown monitor: a >=5% close below Creek within the 10 bars
        // following recovery invalidates the range rather than merely this
        // pattern.
        let breakdown_threshold = creek.price * dec!(0.95);
        let monitor_start = bars.len().min(i + recovery_bars as usize + 1);
        let monitor_end = bars.len().min(i + recovery_bars as usize + 11);
        if bars[monitor_start..monitor_end].iter().any(|b| b.close <= breakdown_threshold) {
            return Ok(SpringOutcome::RangeInvalidated { bar_index: i });
        }

        let spring = Spring {
            bar_index: i,
            timestamp: bar.timestamp,
            penetration_pct,
            volume_ratio,
            recovery_bars,
            creek_reference: creek.price,
            spring_low: bar.low,
            recovery_price: recovery_bar.close,
            asset_class: scorer.asset_class(),
            volume_reliability: match scorer.volume_reliability() {
                VolumeReliability::High => VolumeReliability::High,
                VolumeReliability::Low => VolumeReliability::Low,
            },
            session,
            session_confidence_penalty,
            is_tradeable,
            confidence: base_confidence,
            rejected_by_session_filter,
            rejection_reason,
            rejection_timestamp,
        };
        return Ok(SpringOutcome::Detected(spring));
    }

    Ok(SpringOutcome::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::StockScorer;
    use chrono::{TimeZone, Utc};
    use wyckoff_core::time::Timeframe;

    fn make_bars(creek: Decimal, candidate_idx: usize, candidate_volume: i64) -> Vec<OhlcvBar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..30)
            .map(|i| {
                let is_candidate = i == candidate_idx;
                let low = if is_candidate { creek - dec!(1.5) } else { creek + dec!(1) };
                OhlcvBar {
                    symbol: "TEST".into(),
                    timeframe: Timeframe::D1,
                    timestamp: base + chrono::Duration::days(i as i64),
                    open: low + dec!(0.5),
                    high: low + dec!(2),
                    low,
                    close: if i == candidate_idx + 1 { creek + dec!(0.5) } else { low + dec!(1) },
                    volume: if is_candidate { candidate_volume } else { 1_000_000 },
                }
            })
            .collect()
    }

    fn flat_ratios(bars: &[OhlcvBar], candidate_idx: usize, ratio: Decimal) -> Vec<Option<Decimal>> {
        bars.iter()
            .enumerate()
            .map(|(i, _)| if i == candidate_idx { Some(ratio) } else { Some(dec!(1.0)) })
            .collect()
    }

    #[test]
    fn detects_a_valid_spring() {
        let creek = dec!(100.0);
        let bars = make_bars(creek, 22, 220_000);
        let ratios = flat_ratios(&bars, 22, dec!(0.22));
        let creek_level = CreekLevel {
            price: creek,
            strength: dec!(85),
            provenance: vec![5, 10],
        };
        let config = DetectionConfig::default();
        let scorer = StockScorer;
        let outcome = detect_spring(&bars, WyckoffPhase::C, &creek_level, &ratios, &config, &scorer, true).unwrap();
        assert!(matches!(outcome, SpringOutcome::Detected(_)));
    }

    #[test]
    fn rejects_high_volume_candidate() {
        let creek = dec!(100.0);
        let bars = make_bars(creek, 22, 750_000);
        let ratios = flat_ratios(&bars, 22, dec!(0.75));
        let creek_level = CreekLevel {
            price: creek,
            strength: dec!(85),
            provenance: vec![5, 10],
        };
        let config = DetectionConfig::default();
        let scorer = StockScorer;
        let outcome = detect_spring(&bars, WyckoffPhase::C, &creek_level, &ratios, &config, &scorer, true).unwrap();
        assert!(matches!(outcome, SpringOutcome::None));
    }

    #[test]
    fn wrong_phase_yields_no_candidate() {
        let creek = dec!(100.0);
        let bars = make_bars(creek, 22, 220_000);
        let ratios = flat_ratios(&bars, 22, dec!(0.22));
        let creek_level = CreekLevel {
            price: creek,
            strength: dec!(85),
            provenance: vec![5, 10],
        };
        let config = DetectionConfig::default();
        let scorer = StockScorer;
        let outcome = detect_spring(&bars, WyckoffPhase::B, &creek_level, &ratios, &config, &scorer, true).unwrap();
        assert!(matches!(outcome, SpringOutcome::None));
    }
}
