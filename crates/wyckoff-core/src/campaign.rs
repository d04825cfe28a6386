//! `Campaign`, the aggregation unit produced by component E (spec.md §3,
//! §4.E).

use crate::pattern::Pattern;
use crate::phase::WyckoffPhase;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    Forming,
    Active,
    Dormant,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TargetHit,
    StopOut,
    TimeExit,
    PhaseE,
    ManualExit,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Declining,
    Neutral,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortVsResult {
    Harmony,
    Divergence,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub symbol: String,
    pub state: CampaignState,
    pub patterns: Vec<Pattern>,
    pub current_phase: WyckoffPhase,
    pub start_time: DateTime<Utc>,
    pub failure_reason: Option<String>,

    // Risk metadata (spec.md §4.E).
    pub support_level: Decimal,
    pub resistance_level: Decimal,
    pub strength_score: Decimal,
    pub risk_per_share: Decimal,
    pub range_width_pct: Decimal,

    // Sizing.
    pub position_size: Decimal,
    pub dollar_risk: Decimal,

    // Wyckoff exit levels.
    pub jump_level: Decimal,
    pub original_ice_level: Decimal,
    pub ice_expansion_count: u32,

    pub phase_history: Vec<(DateTime<Utc>, WyckoffPhase)>,

    // Volume-profile telemetry.
    pub volume_trend: VolumeTrend,
    pub effort_vs_result: EffortVsResult,
    pub climax_detected: bool,
    /// In [0, 1] when computable from a Spring's volume/AR-latency/quality.
    pub absorption_quality: Option<Decimal>,

    // Completion fields.
    pub exit_price: Option<Decimal>,
    pub exit_timestamp: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub r_multiple: Option<Decimal>,
    pub points_gained: Option<Decimal>,
    pub duration_bars: Option<usize>,
}

impl Campaign {
    pub fn new(id: Uuid, symbol: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            state: CampaignState::Forming,
            patterns: Vec::new(),
            current_phase: WyckoffPhase::B,
            start_time,
            failure_reason: None,
            support_level: Decimal::ZERO,
            resistance_level: Decimal::ZERO,
            strength_score: Decimal::ZERO,
            risk_per_share: Decimal::ZERO,
            range_width_pct: Decimal::ZERO,
            position_size: Decimal::ZERO,
            dollar_risk: Decimal::ZERO,
            jump_level: Decimal::ZERO,
            original_ice_level: Decimal::ZERO,
            ice_expansion_count: 0,
            phase_history: vec![(start_time, WyckoffPhase::B)],
            volume_trend: VolumeTrend::Unknown,
            effort_vs_result: EffortVsResult::Unknown,
            climax_detected: false,
            absorption_quality: None,
            exit_price: None,
            exit_timestamp: None,
            exit_reason: None,
            r_multiple: None,
            points_gained: None,
            duration_bars: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, CampaignState::Completed | CampaignState::Failed)
    }

    /// entry = first pattern's bar close (approximated by its price field,
    /// matching spec.md §4.E `mark_completed`).
    pub fn entry_price(&self) -> Option<Decimal> {
        self.patterns.first().map(|p| p.price())
    }
}
