//! Volume-profile telemetry maintained on every pattern append
//! (spec.md §4.E).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_core::campaign::{Campaign, EffortVsResult, VolumeTrend};
use wyckoff_core::pattern::Pattern;

const CLIMAX_VOLUME_RATIO: Decimal = dec!(2.0);

/// Updates `volume_trend`, `effort_vs_result`, and `climax_detected` from
/// the campaign's current pattern sequence. Call after every append.
pub fn update_volume_telemetry(campaign: &mut Campaign) {
    let recent: Vec<Decimal> = campaign
        .patterns
        .iter()
        .rev()
        .take(5)
        .map(|p| p.volume_ratio())
        .collect();

    campaign.volume_trend = classify_volume_trend(&recent);
    campaign.climax_detected = campaign.patterns.iter().any(|p| p.volume_ratio() > CLIMAX_VOLUME_RATIO);

    if let Some(latest) = campaign.patterns.last() {
        campaign.effort_vs_result = classify_effort_vs_result(latest);
    }

    if let Some(spring) = campaign.patterns.iter().find_map(|p| match p {
        Pattern::Spring(s) => Some(s),
        _ => None,
    }) {
        let ar_latency = campaign.patterns.iter().find_map(|p| match p {
            Pattern::AutomaticRally(ar) => Some(ar.bars_after_sc),
            _ => None,
        });
        campaign.absorption_quality = Some(absorption_quality(spring.volume_ratio, ar_latency, spring.confidence));
    }
}

/// >=70% of the recent ratios moving the same direction (above/below 1.0)
/// counts as INCREASING/DECLINING; otherwise NEUTRAL.
fn classify_volume_trend(recent: &[Decimal]) -> VolumeTrend {
    if recent.is_empty() {
        return VolumeTrend::Unknown;
    }
    let above = recent.iter().filter(|r| **r > Decimal::ONE).count();
    let below = recent.iter().filter(|r| **r < Decimal::ONE).count();
    let total = recent.len();
    let threshold = (total * 7 + 9) / 10; // ceil(70% of total)

    if above >= threshold {
        VolumeTrend::Increasing
    } else if below >= threshold {
        VolumeTrend::Declining
    } else {
        VolumeTrend::Neutral
    }
}

/// High effort (volume_ratio well above normal) producing a small result
/// (low confidence) signals DIVERGENCE; both high signals HARMONY.
fn classify_effort_vs_result(pattern: &Pattern) -> EffortVsResult {
    let effort = pattern.volume_ratio();
    let result = pattern.confidence_pct();
    if effort >= dec!(1.5) && result < dec!(70) {
        EffortVsResult::Divergence
    } else if effort >= dec!(1.5) && result >= dec!(70) {
        EffortVsResult::Harmony
    } else {
        EffortVsResult::Unknown
    }
}

/// Weighted from volume quality (<=50%), AR latency (<=30%), and Spring
/// confidence (<=20%), normalized to [0, 1].
fn absorption_quality(spring_volume_ratio: Decimal, ar_bars_after_sc: Option<u8>, spring_confidence: u8) -> Decimal {
    let volume_component = ((dec!(0.7) - spring_volume_ratio) / dec!(0.7) * dec!(0.5)).clamp(Decimal::ZERO, dec!(0.5));
    let latency_component = match ar_bars_after_sc {
        Some(bars) => ((dec!(10) - Decimal::from(bars)) / dec!(10) * dec!(0.3)).clamp(Decimal::ZERO, dec!(0.3)),
        None => Decimal::ZERO,
    };
    let confidence_component = Decimal::from(spring_confidence) / dec!(100) * dec!(0.2);

    (volume_component + latency_component + confidence_component).min(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_above_one_is_increasing() {
        let recent = vec![dec!(1.5), dec!(1.2), dec!(1.8), dec!(0.9)];
        assert_eq!(classify_volume_trend(&recent), VolumeTrend::Increasing);
    }

    #[test]
    fn mixed_is_neutral() {
        let recent = vec![dec!(1.5), dec!(0.5)];
        assert_eq!(classify_volume_trend(&recent), VolumeTrend::Neutral);
    }
}
