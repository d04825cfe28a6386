//! Pivot detection: local highs/lows used to seed range candidates.

use rust_decimal::Decimal;
use wyckoff_core::bar::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub index: usize,
    pub price: Decimal,
    pub kind: PivotKind,
}

/// A bar at `i` is a pivot high/low if it strictly exceeds `lookback` bars
/// on both sides. `lookback` of 2 matches the teacher's 5-bar pivot window.
pub fn detect_pivots(bars: &[OhlcvBar], lookback: usize) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    if bars.len() < lookback * 2 + 1 {
        return pivots;
    }
    for i in lookback..bars.len() - lookback {
        let window = &bars[i - lookback..=i + lookback];
        let high = bars[i].high;
        let low = bars[i].low;

        if window.iter().all(|b| b.high <= high) && window.iter().filter(|b| b.high == high).count() == 1 {
            pivots.push(Pivot {
                index: i,
                price: high,
                kind: PivotKind::High,
            });
        }
        if window.iter().all(|b| b.low >= low) && window.iter().filter(|b| b.low == low).count() == 1 {
            pivots.push(Pivot {
                index: i,
                price: low,
                kind: PivotKind::Low,
            });
        }
    }
    pivots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use wyckoff_core::time::Timeframe;

    fn bar(high: Decimal, low: Decimal, i: i64) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(i),
            open: low,
            high,
            low,
            close: low,
            volume: 1000,
        }
    }

    #[test]
    fn finds_a_single_pivot_low() {
        let prices = [dec!(10), dec!(9), dec!(8), dec!(5), dec!(8), dec!(9), dec!(10)];
        let bars: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| bar(p + dec!(1), p, i as i64))
            .collect();
        let pivots = detect_pivots(&bars, 2);
        assert!(pivots.iter().any(|p| p.index == 3 && p.kind == PivotKind::Low));
    }
}
