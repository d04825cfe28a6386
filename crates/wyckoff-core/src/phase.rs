//! Wyckoff phases and the event evidence the Phase Classifier (component C)
//! consumes to determine them (spec.md §3, §4.C).

use crate::pattern::{AutomaticRally, LastPointOfSupport, SecondaryTest, SellingClimaxEvidence, SignOfStrength, Spring};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minimum confidence for a phase classification to gate downstream pattern
/// detection and signal generation (spec.md §4.C).
pub const MIN_PHASE_CONFIDENCE: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WyckoffPhase {
    A,
    B,
    C,
    D,
    E,
}

/// Evidence collected for a trading range: the presence and quality of each
/// Wyckoff event. `sc` anchors Phase A; `st` accumulates every Secondary
/// Test found (numbered in detection order).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseEvents {
    pub sc: Option<SellingClimaxEvidence>,
    pub ar: Option<AutomaticRally>,
    pub st: Vec<SecondaryTest>,
    pub spring: Option<Spring>,
    pub sos: Option<SignOfStrength>,
    pub lps: Option<LastPointOfSupport>,
    /// Whether markup/markdown continuation evidence exists after SOS,
    /// required for a confident Phase E classification.
    pub continuation_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseClassification {
    pub phase: WyckoffPhase,
    /// Bounded sum of event presence (0-40), event quality (0-30), sequence
    /// validity (0-20), and range context (0-10); capped at 100.
    pub confidence: u8,
    pub phase_start_index: usize,
    pub phase_start_timestamp: DateTime<Utc>,
    pub events: PhaseEvents,
    pub trading_allowed: bool,
}

impl PhaseClassification {
    pub fn new(
        phase: WyckoffPhase,
        confidence: u8,
        phase_start_index: usize,
        phase_start_timestamp: DateTime<Utc>,
        events: PhaseEvents,
    ) -> Self {
        Self {
            phase,
            confidence,
            phase_start_index,
            phase_start_timestamp,
            trading_allowed: confidence >= MIN_PHASE_CONFIDENCE,
            events,
        }
    }
}

/// A support/resistance band price must sit within, expressed as a
/// percentage tolerance — used by the range-context confidence component.
pub fn within_tolerance(price: Decimal, level: Decimal, tolerance_pct: Decimal) -> bool {
    if level == Decimal::ZERO {
        return false;
    }
    ((price - level) / level).abs() <= tolerance_pct
}
