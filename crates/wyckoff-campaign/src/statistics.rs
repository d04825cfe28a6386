//! Campaign statistics: overview, performance, exit-reason and
//! pattern-sequence breakdowns, phase distributions (spec.md §4.E).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;
use wyckoff_core::campaign::{Campaign, CampaignState, ExitReason};
use wyckoff_core::pattern::Pattern;
use wyckoff_core::phase::WyckoffPhase;

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    /// completed campaigns with `r_multiple > 0` over all completed.
    pub success_rate: Decimal,
}

pub fn overview(campaigns: &[&Campaign]) -> Overview {
    let total = campaigns.len();
    let active = campaigns.iter().filter(|c| c.state == CampaignState::Active).count();
    let completed_campaigns: Vec<_> = campaigns.iter().filter(|c| c.state == CampaignState::Completed).collect();
    let failed = campaigns.iter().filter(|c| c.state == CampaignState::Failed).count();
    let completed = completed_campaigns.len();

    let wins = completed_campaigns
        .iter()
        .filter(|c| c.r_multiple.map(|r| r > Decimal::ZERO).unwrap_or(false))
        .count();
    let success_rate = if completed == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(wins) / Decimal::from(completed)
    };

    Overview { total, active, completed, failed, success_rate }
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub win_rate: Decimal,
    pub mean_r: Decimal,
    pub median_r: Decimal,
    pub max_r: Decimal,
    pub min_r: Decimal,
    pub total_r: Decimal,
    pub avg_duration_bars: Decimal,
    pub wins: usize,
    pub losses: usize,
}

pub fn performance(campaigns: &[&Campaign]) -> Performance {
    let r_multiples: Vec<Decimal> = campaigns
        .iter()
        .filter(|c| c.state == CampaignState::Completed)
        .filter_map(|c| c.r_multiple)
        .collect();

    if r_multiples.is_empty() {
        return Performance {
            win_rate: Decimal::ZERO,
            mean_r: Decimal::ZERO,
            median_r: Decimal::ZERO,
            max_r: Decimal::ZERO,
            min_r: Decimal::ZERO,
            total_r: Decimal::ZERO,
            avg_duration_bars: Decimal::ZERO,
            wins: 0,
            losses: 0,
        };
    }

    let wins = r_multiples.iter().filter(|r| **r > Decimal::ZERO).count();
    let losses = r_multiples.iter().filter(|r| **r <= Decimal::ZERO).count();
    let win_rate = Decimal::from(wins) / Decimal::from(r_multiples.len());

    let total_r: Decimal = r_multiples.iter().sum();
    let mean_r = total_r / Decimal::from(r_multiples.len());

    let mut sorted = r_multiples.clone();
    sorted.sort();
    let median_r = median(&sorted);
    let max_r = *sorted.last().unwrap();
    let min_r = *sorted.first().unwrap();

    let durations: Vec<usize> = campaigns
        .iter()
        .filter(|c| c.state == CampaignState::Completed)
        .filter_map(|c| c.duration_bars)
        .collect();
    let avg_duration_bars = if durations.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(durations.iter().sum::<usize>()) / Decimal::from(durations.len())
    };

    Performance { win_rate, mean_r, median_r, max_r, min_r, total_r, avg_duration_bars, wins, losses }
}

fn median(sorted: &[Decimal]) -> Decimal {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / dec!(2)
    }
}

pub fn exit_reason_breakdown(campaigns: &[&Campaign]) -> HashMap<ExitReason, usize> {
    let mut breakdown: HashMap<ExitReason, usize> = HashMap::new();
    for campaign in campaigns {
        if let Some(reason) = campaign.exit_reason {
            *breakdown.entry(reason).or_insert(0) += 1;
        }
    }
    breakdown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSequenceKind {
    SpringSos,
    SpringArSos,
    SpringArSosLps,
    Other,
}

fn classify_sequence(patterns: &[Pattern]) -> PatternSequenceKind {
    let kinds: Vec<&'static str> = patterns.iter().map(|p| p.kind_name()).collect();
    match kinds.as_slice() {
        ["spring", "sign_of_strength"] => PatternSequenceKind::SpringSos,
        ["spring", "automatic_rally", "sign_of_strength"] => PatternSequenceKind::SpringArSos,
        ["spring", "automatic_rally", "sign_of_strength", "last_point_of_support"] => {
            PatternSequenceKind::SpringArSosLps
        }
        _ => PatternSequenceKind::Other,
    }
}

pub fn pattern_sequence_breakdown(campaigns: &[&Campaign]) -> HashMap<PatternSequenceKind, usize> {
    let mut breakdown: HashMap<PatternSequenceKind, usize> = HashMap::new();
    for campaign in campaigns {
        let kind = classify_sequence(&campaign.patterns);
        *breakdown.entry(kind).or_insert(0) += 1;
    }
    breakdown
}

pub fn entry_phase_distribution(campaigns: &[&Campaign]) -> HashMap<WyckoffPhase, usize> {
    let mut distribution: HashMap<WyckoffPhase, usize> = HashMap::new();
    for campaign in campaigns {
        if let Some((_, phase)) = campaign.phase_history.first() {
            *distribution.entry(*phase).or_insert(0) += 1;
        }
    }
    distribution
}

pub fn exit_phase_distribution(campaigns: &[&Campaign]) -> HashMap<WyckoffPhase, usize> {
    let mut distribution: HashMap<WyckoffPhase, usize> = HashMap::new();
    for campaign in campaigns {
        if campaign.state == CampaignState::Completed {
            *distribution.entry(campaign.current_phase).or_insert(0) += 1;
        }
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wyckoff_core::campaign::Campaign;

    #[test]
    fn overview_counts_states() {
        let mut a = Campaign::new(uuid::Uuid::new_v4(), "A", Utc::now());
        a.state = CampaignState::Active;
        let mut b = Campaign::new(uuid::Uuid::new_v4(), "B", Utc::now());
        b.state = CampaignState::Completed;
        b.r_multiple = Some(dec!(1.5));
        let refs = vec![&a, &b];
        let result = overview(&refs);
        assert_eq!(result.total, 2);
        assert_eq!(result.active, 1);
        assert_eq!(result.completed, 1);
        assert_eq!(result.success_rate, Decimal::ONE);
    }
}
