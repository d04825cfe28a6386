//! Trade signal: the orchestrator's terminal output, produced when a
//! campaign's latest pattern clears the confidence floor at a tradeable
//! phase (spec.md §6 exposed contracts, persistence layout).

use crate::asset::AssetClass;
use crate::phase::WyckoffPhase;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub id: Uuid,
    pub symbol: String,
    pub campaign_id: Uuid,
    pub asset_class: AssetClass,
    pub phase: WyckoffPhase,
    pub pattern_kind: &'static str,
    pub confidence: u8,
    pub entry_price: Decimal,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    pub position_size: Decimal,
    pub generated_at: DateTime<Utc>,
}
