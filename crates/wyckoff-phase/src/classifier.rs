//! Component C: determines the Wyckoff phase from collected event evidence
//! and scores confidence as the bounded sum of four components
//! (spec.md §4.C).

use crate::error::PhaseError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::phase::{within_tolerance, PhaseClassification, PhaseEvents, WyckoffPhase};
use wyckoff_core::range::TradingRange;

const RANGE_CONTEXT_TOLERANCE: Decimal = dec!(0.02);

/// Determines phase from the highest completed checklist: a later-phase
/// event implies the range has progressed past the phases before it.
fn determine_phase(events: &PhaseEvents) -> WyckoffPhase {
    let has_sos = events.sos.is_some();
    if has_sos && events.continuation_confirmed {
        WyckoffPhase::E
    } else if has_sos {
        WyckoffPhase::D
    } else if events.spring.is_some() {
        WyckoffPhase::C
    } else if !events.st.is_empty() {
        WyckoffPhase::B
    } else {
        WyckoffPhase::A
    }
}

fn a_complete(events: &PhaseEvents) -> bool {
    events.sc.is_some() && events.ar.is_some()
}

fn b_complete(events: &PhaseEvents) -> bool {
    a_complete(events) && events.st.len() >= 2
}

/// Event Presence (0-40): per-phase required-event checklist.
fn event_presence(phase: WyckoffPhase, events: &PhaseEvents) -> u8 {
    match phase {
        WyckoffPhase::A => {
            let sc = if events.sc.is_some() { 20 } else { 0 };
            let ar = if events.ar.is_some() { 20 } else { 0 };
            sc + ar
        }
        WyckoffPhase::B => {
            let a = if a_complete(events) { 20 } else { 0 };
            let st = match events.st.len() {
                0 => 0,
                1 => 10,
                _ => 20,
            };
            a + st
        }
        WyckoffPhase::C => {
            let b = if b_complete(events) { 20 } else { 0 };
            let spring = if events.spring.is_some() { 20 } else { 0 };
            b + spring
        }
        WyckoffPhase::D => {
            if events.sos.is_some() {
                40
            } else {
                0
            }
        }
        WyckoffPhase::E => {
            let d = if events.sos.is_some() { 20 } else { 0 };
            let continuation = if events.continuation_confirmed { 20 } else { 0 };
            d + continuation
        }
    }
}

/// Event Quality (0-30): average of every present event's own confidence,
/// scaled from a 0-100 scale down to 0-30.
fn event_quality(events: &PhaseEvents) -> Decimal {
    let mut confidences: Vec<Decimal> = Vec::new();
    if let Some(sc) = &events.sc {
        confidences.push(Decimal::from(sc.confidence));
    }
    if let Some(ar) = &events.ar {
        confidences.push(ar.quality_score * Decimal::from(100));
    }
    for st in &events.st {
        confidences.push(Decimal::from(st.confidence));
    }
    if let Some(spring) = &events.spring {
        confidences.push(Decimal::from(spring.confidence));
    }
    if let Some(sos) = &events.sos {
        confidences.push(Decimal::from(sos.confidence));
    }
    if let Some(lps) = &events.lps {
        confidences.push(Decimal::from(lps.confidence));
    }
    if confidences.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = confidences.iter().sum();
    let avg = sum / Decimal::from(confidences.len());
    (avg * dec!(0.3)).min(Decimal::from(30))
}

/// Sequence Validity (0-20): chronological order between events. Starts at
/// 20 and deducts for each ordering rule broken.
fn sequence_validity(events: &PhaseEvents) -> Decimal {
    let mut score = dec!(20);

    if let (Some(sc), Some(ar)) = (&events.sc, &events.ar) {
        if ar.bar_index <= sc.bar_index {
            score -= dec!(5);
        }
        if ar.bars_after_sc > 10 {
            score -= dec!(5);
        }
    }

    for pair in events.st.windows(2) {
        let gap = pair[1].bar_index.saturating_sub(pair[0].bar_index);
        if gap < 3 {
            score -= dec!(3);
        }
    }

    if let Some(spring) = &events.spring {
        if let Some(last_st) = events.st.last() {
            if spring.bar_index <= last_st.bar_index {
                score -= dec!(5);
            }
        }
    }

    if let Some(sos) = &events.sos {
        if let Some(spring) = &events.spring {
            if sos.bar_index <= spring.bar_index {
                score -= dec!(3);
            }
        }
    }

    score.max(Decimal::ZERO)
}

/// Range Context (0-10): each satisfied geometric check against the range's
/// support/resistance contributes up to 2; absent events are skipped.
fn range_context(events: &PhaseEvents, range: &TradingRange) -> Decimal {
    let mut score = Decimal::ZERO;

    if let Some(sc) = &events.sc {
        if within_tolerance(sc.low, range.support, RANGE_CONTEXT_TOLERANCE) {
            score += dec!(2);
        }
    }
    if let Some(ar) = &events.ar {
        if ar.ar_high <= range.resistance {
            score += dec!(2);
        }
    }
    if !events.st.is_empty() {
        let all_within = events
            .st
            .iter()
            .all(|st| st.distance_from_sc_low <= RANGE_CONTEXT_TOLERANCE && st.penetration <= dec!(0.01));
        if all_within {
            score += dec!(2);
        }
    }
    if let Some(sos) = &events.sos {
        if sos.breakout_price > range.resistance {
            score += dec!(2);
        }
    }
    if events.continuation_confirmed {
        if let Some(ice) = &range.ice {
            if range.resistance >= ice.price {
                score += dec!(2);
            }
        }
    }

    score.min(Decimal::from(10))
}

/// Classifies the phase of a trading range from its collected events.
pub fn classify_phase(range: &TradingRange, events: PhaseEvents) -> Result<PhaseClassification, PhaseError> {
    let phase = determine_phase(&events);

    let presence = Decimal::from(event_presence(phase, &events));
    let quality = event_quality(&events);
    let sequence = sequence_validity(&events);
    let context = range_context(&events, range);

    let confidence = (presence + quality + sequence + context).min(Decimal::from(100));
    let confidence: u8 = confidence.round().to_u8().unwrap_or(0);

    let (phase_start_index, phase_start_timestamp) = match &events.sc {
        Some(sc) => (sc.bar_index, sc.timestamp),
        None => (range.start_index, range.start_timestamp),
    };

    Ok(PhaseClassification::new(
        phase,
        confidence,
        phase_start_index,
        phase_start_timestamp,
        events,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wyckoff_core::levels::LevelVote;
    use wyckoff_core::pattern::{AutomaticRally, SellingClimaxEvidence, VolumeProfile};
    use wyckoff_core::phase::WyckoffPhase;
    use wyckoff_core::range::RangeStatus;
    use wyckoff_core::time::Timeframe;

    fn sample_range() -> TradingRange {
        TradingRange {
            id: uuid::Uuid::new_v4(),
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            start_timestamp: Utc::now(),
            end_timestamp: Utc::now(),
            start_index: 0,
            end_index: 30,
            support: dec!(90),
            resistance: dec!(110),
            touch_count_support: 2,
            touch_count_resistance: 2,
            quality_score: dec!(75),
            status: RangeStatus::Active,
            cause_factor: dec!(2.5),
            phase: WyckoffPhase::A,
            creek: Some(LevelVote { price: dec!(90), strength: dec!(80), provenance: vec![1] }),
            ice: Some(LevelVote { price: dec!(110), strength: dec!(80), provenance: vec![2] }),
            jump: None,
            deleted: false,
        }
    }

    #[test]
    fn phase_a_with_sc_and_ar_scores_at_least_forty_presence() {
        let range = sample_range();
        let events = PhaseEvents {
            sc: Some(SellingClimaxEvidence {
                bar_index: 5,
                timestamp: Utc::now(),
                low: dec!(90),
                volume_ratio: dec!(2.5),
                confidence: 80,
            }),
            ar: Some(AutomaticRally {
                bar_index: 8,
                timestamp: Utc::now(),
                rally_pct: dec!(0.05),
                bars_after_sc: 3,
                sc_reference: 5,
                sc_low: dec!(90),
                ar_high: dec!(100),
                volume_profile: VolumeProfile::Normal,
                quality_score: dec!(0.8),
            }),
            ..Default::default()
        };
        let classification = classify_phase(&range, events).unwrap();
        assert_eq!(classification.phase, WyckoffPhase::A);
        assert!(classification.confidence >= 40);
    }

    #[test]
    fn below_floor_confidence_disallows_trading() {
        let range = sample_range();
        let classification = classify_phase(&range, PhaseEvents::default()).unwrap();
        assert_eq!(classification.phase, WyckoffPhase::A);
        assert!(!classification.trading_allowed);
    }
}
