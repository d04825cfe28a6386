//! Pattern variants detected by component D (spec.md §3, §4.D). Modeled as
//! a tagged sum type, not a class hierarchy, per spec.md §9 Design Notes:
//! sequence validation and phase inference in the campaign detector switch
//! on the tag rather than downcasting.

use crate::asset::AssetClass;
use crate::bar::OhlcvBar;
use crate::time::ForexSession;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Selling Climax evidence anchoring Phase A. Not part of the `Pattern` sum
/// type (it is never appended to a campaign) but is required context for
/// Automatic Rally and Secondary Test detection and for phase confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellingClimaxEvidence {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub low: Decimal,
    pub volume_ratio: Decimal,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spring {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// (creek - low) / creek, in (0, 0.05].
    pub penetration_pct: Decimal,
    /// Strictly < 0.7 or the candidate would have been rejected outright.
    pub volume_ratio: Decimal,
    /// Bars between the low and the close back above Creek, in [1, 5].
    pub recovery_bars: u8,
    pub creek_reference: Decimal,
    pub spring_low: Decimal,
    pub recovery_price: Decimal,
    pub asset_class: AssetClass,
    /// HIGH for stocks (reported volume), LOW for forex (tick-volume proxy).
    pub volume_reliability: VolumeReliability,
    pub session: Option<ForexSession>,
    /// Confidence penalty applied for session quality when scoring is
    /// enabled (0, -5, -20, or -25). None when session scoring is disabled.
    pub session_confidence_penalty: Option<i16>,
    pub is_tradeable: bool,
    pub confidence: u8,
    pub rejected_by_session_filter: bool,
    pub rejection_reason: Option<String>,
    pub rejection_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeReliability {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeProfile {
    High,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomaticRally {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// (ar_high - sc_low) / sc_low, >= 0.03.
    pub rally_pct: Decimal,
    /// Bars elapsed since the Selling Climax, <= 10.
    pub bars_after_sc: u8,
    pub sc_reference: usize,
    pub sc_low: Decimal,
    pub ar_high: Decimal,
    pub volume_profile: VolumeProfile,
    /// In [0, 1].
    pub quality_score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryTest {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// |test_low - sc_low| / sc_low, within 2%.
    pub distance_from_sc_low: Decimal,
    /// (sc_volume - test_volume) / sc_volume, >= 0.20.
    pub volume_reduction_pct: Decimal,
    /// 1-indexed position among Secondary Tests found for this range.
    pub test_number: u32,
    /// Penetration below sc_low as a fraction; > 0.01 invalidates the test.
    pub penetration: Decimal,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignOfStrength {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// (breakout_price - ice) / ice, >= 0.01.
    pub breakout_pct: Decimal,
    pub volume_ratio: Decimal,
    pub spread_ratio: Decimal,
    pub close_position: Decimal,
    pub breakout_price: Decimal,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastPointOfSupport {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub distance_from_ice: Decimal,
    pub held_support: bool,
    pub volume_ratio: Decimal,
    pub ice_level: Decimal,
    pub confidence: u8,
}

/// The tagged union of detectable Wyckoff patterns, appended in order to a
/// `Campaign`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Spring(Spring),
    AutomaticRally(AutomaticRally),
    SecondaryTest(SecondaryTest),
    SignOfStrength(SignOfStrength),
    LastPointOfSupport(LastPointOfSupport),
}

impl Pattern {
    pub fn bar_index(&self) -> usize {
        match self {
            Pattern::Spring(p) => p.bar_index,
            Pattern::AutomaticRally(p) => p.bar_index,
            Pattern::SecondaryTest(p) => p.bar_index,
            Pattern::SignOfStrength(p) => p.bar_index,
            Pattern::LastPointOfSupport(p) => p.bar_index,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Pattern::Spring(p) => p.timestamp,
            Pattern::AutomaticRally(p) => p.timestamp,
            Pattern::SecondaryTest(p) => p.timestamp,
            Pattern::SignOfStrength(p) => p.timestamp,
            Pattern::LastPointOfSupport(p) => p.timestamp,
        }
    }

    /// Confidence on a 0-100 scale, normalizing AR's [0,1] quality_score.
    pub fn confidence_pct(&self) -> Decimal {
        match self {
            Pattern::Spring(p) => Decimal::from(p.confidence),
            Pattern::AutomaticRally(p) => p.quality_score * Decimal::from(100),
            Pattern::SecondaryTest(p) => Decimal::from(p.confidence),
            Pattern::SignOfStrength(p) => Decimal::from(p.confidence),
            Pattern::LastPointOfSupport(p) => Decimal::from(p.confidence),
        }
    }

    /// The volume_ratio attached to the event that produced this pattern,
    /// used by the campaign detector's volume-profile telemetry.
    pub fn volume_ratio(&self) -> Decimal {
        match self {
            Pattern::Spring(p) => p.volume_ratio,
            Pattern::AutomaticRally(p) => {
                if p.volume_profile == VolumeProfile::High {
                    Decimal::new(15, 1)
                } else {
                    Decimal::ONE
                }
            }
            Pattern::SecondaryTest(p) => Decimal::ONE - p.volume_reduction_pct,
            Pattern::SignOfStrength(p) => p.volume_ratio,
            Pattern::LastPointOfSupport(p) => p.volume_ratio,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Pattern::Spring(_) => "spring",
            Pattern::AutomaticRally(_) => "automatic_rally",
            Pattern::SecondaryTest(_) => "secondary_test",
            Pattern::SignOfStrength(_) => "sign_of_strength",
            Pattern::LastPointOfSupport(_) => "last_point_of_support",
        }
    }

    /// The bar's close price, used as entry/exit price reference by the
    /// campaign detector.
    pub fn price(&self) -> Decimal {
        match self {
            Pattern::Spring(p) => p.recovery_price,
            Pattern::AutomaticRally(p) => p.ar_high,
            Pattern::SecondaryTest(_) => Decimal::ZERO,
            Pattern::SignOfStrength(p) => p.breakout_price,
            Pattern::LastPointOfSupport(p) => p.ice_level,
        }
    }
}

/// Ensures every detector is handed bars it can actually index into.
pub fn bar_at(bars: &[OhlcvBar], index: usize) -> Option<&OhlcvBar> {
    bars.get(index)
}
