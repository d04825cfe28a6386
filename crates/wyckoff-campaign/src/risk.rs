//! Risk metadata, position sizing, and portfolio-heat admission
//! (spec.md §4.E).

use crate::error::CampaignError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;
use wyckoff_core::campaign::Campaign;
use wyckoff_core::pattern::Pattern;

/// `round((account_equity * risk_pct_per_trade / 100) / risk_per_share)`.
/// `risk_pct_per_trade` is hard-capped at 2.0 — exceeding it is a
/// validation error, not a degraded result. Any other invalid input
/// (non-positive equity, non-positive risk_per_share, negative risk_pct)
/// degrades to 0 rather than erroring (spec.md §4.E).
pub fn calculate_position_size(
    account_equity: Decimal,
    risk_pct_per_trade: Decimal,
    risk_per_share: Decimal,
) -> Result<Decimal, CampaignError> {
    if risk_pct_per_trade > dec!(2.0) {
        return Err(CampaignError::Validation(format!(
            "risk_pct_per_trade {} exceeds the 2.0 hard cap",
            risk_pct_per_trade
        )));
    }
    if account_equity <= Decimal::ZERO || risk_per_share <= Decimal::ZERO || risk_pct_per_trade < Decimal::ZERO {
        warn!(
            %account_equity,
            %risk_pct_per_trade,
            %risk_per_share,
            "invalid position sizing inputs, returning 0"
        );
        return Ok(Decimal::ZERO);
    }

    let dollar_risk_budget = account_equity * risk_pct_per_trade / dec!(100);
    Ok((dollar_risk_budget / risk_per_share).round())
}

/// Recomputes a campaign's risk metadata from its current pattern sequence.
/// Called on every `add_pattern`.
pub fn recompute_risk_metadata(campaign: &mut Campaign, latest_price: Decimal) {
    let support_level = campaign
        .patterns
        .iter()
        .filter_map(|p| match p {
            Pattern::Spring(s) => Some(s.spring_low),
            _ => None,
        })
        .min_by(|a, b| a.cmp(b))
        .unwrap_or(campaign.support_level);

    let resistance_level = campaign
        .patterns
        .iter()
        .filter_map(|p| match p {
            Pattern::AutomaticRally(ar) => Some(ar.ar_high),
            Pattern::SignOfStrength(sos) => Some(sos.breakout_price),
            Pattern::LastPointOfSupport(lps) => Some(lps.ice_level),
            _ => None,
        })
        .max_by(|a, b| a.cmp(b))
        .unwrap_or(campaign.resistance_level);

    campaign.support_level = support_level;
    campaign.resistance_level = resistance_level;
    campaign.risk_per_share = latest_price - support_level;
    campaign.range_width_pct = if support_level > Decimal::ZERO {
        (resistance_level - support_level) / support_level * dec!(100)
    } else {
        Decimal::ZERO
    };
    campaign.jump_level = resistance_level + (resistance_level - support_level);
    campaign.strength_score = strength_score(campaign);
}

/// `(pattern count 0.1-0.3) + (avg pattern quality * 0.4) + sequence/phase
/// bonuses`, in [0, 1].
fn strength_score(campaign: &Campaign) -> Decimal {
    let count_component = (Decimal::from(campaign.patterns.len()) * dec!(0.1)).min(dec!(0.3));

    let avg_quality = if campaign.patterns.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = campaign.patterns.iter().map(|p| p.confidence_pct() / dec!(100)).sum();
        sum / Decimal::from(campaign.patterns.len())
    };
    let quality_component = avg_quality * dec!(0.4);

    let has_spring = campaign.patterns.iter().any(|p| matches!(p, Pattern::Spring(_)));
    let has_ar = campaign.patterns.iter().any(|p| matches!(p, Pattern::AutomaticRally(_)));
    let has_sos = campaign.patterns.iter().any(|p| matches!(p, Pattern::SignOfStrength(_)));
    let sequence_bonus = if has_spring && has_ar && has_sos {
        let ar_quality_bonus = campaign
            .patterns
            .iter()
            .find_map(|p| match p {
                Pattern::AutomaticRally(ar) if ar.quality_score > dec!(0.75) => Some(dec!(0.05)),
                _ => None,
            })
            .unwrap_or(Decimal::ZERO);
        dec!(0.10) + ar_quality_bonus
    } else {
        Decimal::ZERO
    };

    let phase_bonus = match campaign.current_phase {
        wyckoff_core::phase::WyckoffPhase::C => dec!(0.1),
        wyckoff_core::phase::WyckoffPhase::D | wyckoff_core::phase::WyckoffPhase::E => dec!(0.2),
        _ => Decimal::ZERO,
    };

    (count_component + quality_component + sequence_bonus + phase_bonus).min(Decimal::ONE)
}

pub struct PortfolioHeatCheck {
    pub admitted: bool,
    pub reason: Option<String>,
}

/// Pre-admission portfolio limits: reject if active count is at cap or
/// adding the candidate's heat would breach `max_portfolio_heat_pct`.
/// Warns (does not reject) at 80% of either limit.
pub fn check_portfolio_limits(
    active_count: usize,
    max_concurrent: usize,
    current_heat_pct: Decimal,
    prospective_heat_pct: Decimal,
    max_portfolio_heat_pct: Decimal,
) -> PortfolioHeatCheck {
    if active_count >= max_concurrent {
        return PortfolioHeatCheck {
            admitted: false,
            reason: Some(format!("active campaign count {} at or above cap {}", active_count, max_concurrent)),
        };
    }

    let total_heat = current_heat_pct + prospective_heat_pct;
    if total_heat > max_portfolio_heat_pct {
        return PortfolioHeatCheck {
            admitted: false,
            reason: Some(format!(
                "prospective heat {} would exceed portfolio cap {}",
                total_heat, max_portfolio_heat_pct
            )),
        };
    }

    if Decimal::from(active_count) >= Decimal::from(max_concurrent) * dec!(0.8) {
        warn!(active_count, max_concurrent, "approaching concurrent campaign cap");
    }
    if total_heat >= max_portfolio_heat_pct * dec!(0.8) {
        warn!(%total_heat, %max_portfolio_heat_pct, "approaching portfolio heat cap");
    }

    PortfolioHeatCheck { admitted: true, reason: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_cap_exceeded_is_an_error() {
        let result = calculate_position_size(dec!(100_000), dec!(2.5), dec!(5));
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_equity_returns_zero() {
        let result = calculate_position_size(dec!(-1), dec!(1.0), dec!(5)).unwrap();
        assert_eq!(result, Decimal::ZERO);
    }

    #[test]
    fn typical_sizing() {
        // 100_000 * 2% / 100 = 2000; 2000 / 5 = 400.
        let result = calculate_position_size(dec!(100_000), dec!(2.0), dec!(5)).unwrap();
        assert_eq!(result, dec!(400));
    }

    #[test]
    fn heat_over_cap_denies_admission() {
        let check = check_portfolio_limits(2, 3, dec!(7), dec!(4), dec!(10));
        assert!(!check.admitted);
    }
}
