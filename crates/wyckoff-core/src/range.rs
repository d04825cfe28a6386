//! `TradingRange`, the output of component B (spec.md §3, §4.B).

use crate::levels::{CreekLevel, IceLevel, JumpTarget};
use crate::phase::WyckoffPhase;
use crate::time::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    Forming,
    Active,
    Breakout,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingRange {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_timestamp: DateTime<Utc>,
    pub end_timestamp: DateTime<Utc>,
    pub start_index: usize,
    pub end_index: usize,
    pub support: Decimal,
    pub resistance: Decimal,
    pub touch_count_support: u32,
    pub touch_count_resistance: u32,
    /// In [60, 100]; ranges scoring below the configured floor are
    /// discarded before construction.
    pub quality_score: Decimal,
    pub status: RangeStatus,
    /// In [2.0, 3.0]. A Wyckoff "cause" multiplier, not modeled further
    /// here; carried through for consumers that compute price objectives.
    pub cause_factor: Decimal,
    pub phase: WyckoffPhase,
    pub creek: Option<CreekLevel>,
    pub ice: Option<IceLevel>,
    pub jump: Option<JumpTarget>,
    /// Soft-deleted ranges remain addressable by id but are excluded from
    /// matching/lookup by the range index.
    pub deleted: bool,
}

impl TradingRange {
    pub fn duration_bars(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Invariants from spec.md §3: support < resistance; cause_factor in
    /// [2.0, 3.0]; duration_bars in [15, 100].
    pub fn validate(&self) -> Result<(), crate::error::WyckoffError> {
        if self.support >= self.resistance {
            return Err(crate::error::WyckoffError::InvalidInput(
                "support must be strictly below resistance".into(),
            ));
        }
        if self.cause_factor < Decimal::new(20, 1) || self.cause_factor > Decimal::new(30, 1) {
            return Err(crate::error::WyckoffError::InvalidInput(format!(
                "cause_factor {} out of [2.0, 3.0]",
                self.cause_factor
            )));
        }
        let duration = self.duration_bars();
        if !(15..=100).contains(&duration) {
            return Err(crate::error::WyckoffError::InvalidInput(format!(
                "duration_bars {} out of [15, 100]",
                duration
            )));
        }
        if self.quality_score < Decimal::new(60, 0) || self.quality_score > Decimal::new(100, 0) {
            return Err(crate::error::WyckoffError::InvalidInput(format!(
                "quality_score {} out of [60, 100]",
                self.quality_score
            )));
        }
        Ok(())
    }

    /// Active ranges exclude soft-deleted and Failed ones from matching.
    pub fn is_matchable(&self) -> bool {
        !self.deleted && self.status != RangeStatus::Failed
    }
}
