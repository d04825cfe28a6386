//! Campaign state machine: FORMING/ACTIVE/DORMANT/COMPLETED/FAILED
//! transitions, pattern-sequence validity, and phase inference
//! (spec.md §4.E).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use wyckoff_config::CampaignDefaults;
use wyckoff_core::campaign::{Campaign, CampaignState, ExitReason};
use wyckoff_core::pattern::Pattern;
use wyckoff_core::phase::WyckoffPhase;

/// Valid next-pattern kinds per spec.md §4.E. A violation does not block
/// appending the pattern, only its ability to advance the phase.
pub fn is_valid_transition(previous: &Pattern, next: &Pattern) -> bool {
    matches!(
        (previous, next),
        (Pattern::Spring(_), Pattern::Spring(_))
            | (Pattern::Spring(_), Pattern::AutomaticRally(_))
            | (Pattern::Spring(_), Pattern::SignOfStrength(_))
            | (Pattern::AutomaticRally(_), Pattern::SignOfStrength(_))
            | (Pattern::AutomaticRally(_), Pattern::LastPointOfSupport(_))
            | (Pattern::SignOfStrength(_), Pattern::SignOfStrength(_))
            | (Pattern::SignOfStrength(_), Pattern::LastPointOfSupport(_))
            | (Pattern::LastPointOfSupport(_), Pattern::LastPointOfSupport(_))
    )
}

/// Infers phase from the pattern sequence collected so far.
pub fn infer_phase(patterns: &[Pattern]) -> WyckoffPhase {
    let Some(latest) = patterns.last() else {
        return WyckoffPhase::B;
    };
    match latest {
        Pattern::SignOfStrength(_) | Pattern::LastPointOfSupport(_) => WyckoffPhase::D,
        Pattern::AutomaticRally(_) => {
            let preceded_by_spring = patterns[..patterns.len() - 1]
                .iter()
                .rev()
                .any(|p| matches!(p, Pattern::Spring(_)));
            if preceded_by_spring {
                WyckoffPhase::C
            } else {
                WyckoffPhase::B
            }
        }
        Pattern::Spring(_) => WyckoffPhase::C,
        _ => WyckoffPhase::B,
    }
}

/// Appends `pattern`, advancing the phase only if the sequence transition
/// is valid (or this is the campaign's first pattern), and updates state
/// per the FORMING -> ACTIVE rule.
pub fn add_pattern(campaign: &mut Campaign, pattern: Pattern, now: DateTime<Utc>, defaults: &CampaignDefaults) {
    let sequence_valid = campaign
        .patterns
        .last()
        .map(|prev| is_valid_transition(prev, &pattern))
        .unwrap_or(true);

    let high_quality_ar = matches!(&pattern, Pattern::AutomaticRally(ar) if ar.quality_score > dec!(0.7));

    campaign.patterns.push(pattern);

    if sequence_valid {
        let phase = infer_phase(&campaign.patterns);
        if phase != campaign.current_phase {
            campaign.current_phase = phase;
            campaign.phase_history.push((now, phase));
        }
    }

    if campaign.state == CampaignState::Forming {
        let within_gap = (now - campaign.start_time).num_hours() <= defaults.max_pattern_gap_hours as i64;
        if (campaign.patterns.len() >= defaults.min_patterns_for_active as usize && within_gap) || high_quality_ar {
            campaign.state = CampaignState::Active;
        }
    } else if campaign.state == CampaignState::Dormant {
        campaign.state = CampaignState::Active;
    }
}

/// Evaluates time-based transitions that don't depend on a new pattern:
/// expiration and dormancy. Call this on a tick, not just on pattern append.
pub fn evaluate_time_transitions(
    campaign: &mut Campaign,
    now: DateTime<Utc>,
    defaults: &CampaignDefaults,
    last_pattern_time: Option<DateTime<Utc>>,
) {
    if campaign.is_terminal() {
        return;
    }

    let age_hours = (now - campaign.start_time).num_hours();
    if age_hours > defaults.expiration_hours as i64 {
        campaign.state = CampaignState::Failed;
        campaign.failure_reason = Some("expiration".to_string());
        return;
    }

    if campaign.state == CampaignState::Active {
        if let Some(last) = last_pattern_time {
            let idle_hours = (now - last).num_hours();
            if idle_hours > defaults.campaign_window_hours as i64 {
                campaign.state = CampaignState::Dormant;
            }
        }
    }
}

/// Marks a campaign COMPLETED on reaching Phase E or by manual request.
pub fn mark_phase_e_complete(campaign: &mut Campaign) {
    if campaign.current_phase == WyckoffPhase::E {
        campaign.state = CampaignState::Completed;
    }
}

/// `points_gained = exit_price - entry_price` (entry = first pattern's bar
/// close); `r_multiple = points_gained / risk_per_share`, undefined when
/// `risk_per_share <= 0`; `duration_bars` from first/last pattern indices
/// (spec.md §4.E).
pub fn mark_completed(campaign: &mut Campaign, exit_price: Decimal, exit_reason: ExitReason, exit_timestamp: DateTime<Utc>) {
    let entry_price = campaign.entry_price().unwrap_or(Decimal::ZERO);
    let points_gained = exit_price - entry_price;
    let r_multiple = if campaign.risk_per_share > Decimal::ZERO {
        Some(points_gained / campaign.risk_per_share)
    } else {
        None
    };
    let duration_bars = match (campaign.patterns.first(), campaign.patterns.last()) {
        (Some(first), Some(last)) => Some(last.bar_index().saturating_sub(first.bar_index())),
        _ => None,
    };

    campaign.exit_price = Some(exit_price);
    campaign.exit_timestamp = Some(exit_timestamp);
    campaign.exit_reason = Some(exit_reason);
    campaign.points_gained = Some(points_gained);
    campaign.r_multiple = r_multiple;
    campaign.duration_bars = duration_bars;
    campaign.state = CampaignState::Completed;
}
