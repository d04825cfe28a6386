//! The OHLCVBar data model (spec.md §3). Immutable input to every detector.

use crate::time::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar. Bars are never mutated once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl OhlcvBar {
    /// high - low. Zero only for a bar with no intrabar range.
    pub fn spread(&self) -> Decimal {
        self.high - self.low
    }

    /// (close - low) / spread, clamped into [0, 1]. Defined as 0.5 when the
    /// bar has zero spread (spec.md §3).
    pub fn close_position(&self) -> Decimal {
        let spread = self.spread();
        if spread <= Decimal::ZERO {
            return Decimal::new(5, 1); // 0.5
        }
        ((self.close - self.low) / spread).clamp(Decimal::ZERO, Decimal::ONE)
    }
}

/// Validates that a bar sequence is chronologically ordered and of a single
/// symbol/timeframe, as every component in spec.md §4 requires of its input.
pub fn validate_bar_sequence(bars: &[OhlcvBar]) -> Result<(), crate::error::WyckoffError> {
    if bars.is_empty() {
        return Ok(());
    }
    let symbol = &bars[0].symbol;
    let timeframe = bars[0].timeframe;
    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(crate::error::WyckoffError::InvalidInput(format!(
                "bars not chronologically ordered at {} -> {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
    }
    if bars.iter().any(|b| b.symbol != *symbol || b.timeframe != timeframe) {
        return Err(crate::error::WyckoffError::InvalidInput(
            "bars must share a single symbol and timeframe".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn close_position_midpoint_on_zero_spread() {
        let b = bar(dec!(100), dec!(100), dec!(100), dec!(100));
        assert_eq!(b.close_position(), dec!(0.5));
    }

    #[test]
    fn close_position_at_high() {
        let b = bar(dec!(100), dec!(110), dec!(100), dec!(110));
        assert_eq!(b.close_position(), dec!(1));
    }

    #[test]
    fn close_position_at_low() {
        let b = bar(dec!(100), dec!(110), dec!(100), dec!(100));
        assert_eq!(b.close_position(), dec!(0));
    }
}
