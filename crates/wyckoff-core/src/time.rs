//! Timeframes and trading-session classification shared by every detector.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Bar timeframe. Ordering matters for `is_intraday`: anything at or below
/// one hour uses session-relative baselines instead of a flat rolling mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Timeframes at or below 1h use session-relative volume baselines and
    /// are eligible for session-based confidence penalties (spec.md §4.A).
    pub fn is_intraday(self) -> bool {
        matches!(self, Self::M1 | Self::M5 | Self::M15 | Self::M30 | Self::H1)
    }

    /// Whether campaign defaults should use the daily or intraday table
    /// (spec.md §4.E).
    pub fn is_daily_or_above(self) -> bool {
        matches!(self, Self::D1)
    }
}

/// Forex trading sessions used for session-relative volume baselines and
/// Spring confidence penalties. Boundaries are UTC hour-of-day, matching
/// conventional session definitions (Asian/Tokyo, London, New York, the
/// London/New York overlap, and the New York close).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForexSession {
    Asian,
    London,
    NewYork,
    Overlap,
    NewYorkClose,
}

impl ForexSession {
    /// Classify a UTC timestamp into the session active at that hour.
    /// Overlap (London/NY) takes priority over the two session windows it
    /// intersects; NY close (20-22 UTC) is checked before the broader NY
    /// window. Asian covers 0-8 UTC plus the 22-24 tail after NY close.
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        let hour = ts.hour();
        match hour {
            12..=15 => Self::Overlap,
            20..=21 => Self::NewYorkClose,
            16..=19 => Self::NewYork,
            8..=11 => Self::London,
            _ => Self::Asian,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn intraday_timeframes() {
        assert!(Timeframe::M15.is_intraday());
        assert!(Timeframe::H1.is_intraday());
        assert!(!Timeframe::H4.is_intraday());
        assert!(!Timeframe::D1.is_intraday());
    }

    #[test]
    fn session_boundaries() {
        let at = |h: u32| Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap();
        assert_eq!(ForexSession::from_timestamp(at(3)), ForexSession::Asian);
        assert_eq!(ForexSession::from_timestamp(at(7)), ForexSession::Asian);
        assert_eq!(ForexSession::from_timestamp(at(8)), ForexSession::London);
        assert_eq!(ForexSession::from_timestamp(at(13)), ForexSession::Overlap);
        assert_eq!(ForexSession::from_timestamp(at(18)), ForexSession::NewYork);
        assert_eq!(ForexSession::from_timestamp(at(20)), ForexSession::NewYorkClose);
        assert_eq!(ForexSession::from_timestamp(at(21)), ForexSession::NewYorkClose);
        assert_eq!(ForexSession::from_timestamp(at(22)), ForexSession::Asian);
        assert_eq!(ForexSession::from_timestamp(at(23)), ForexSession::Asian);
    }
}
