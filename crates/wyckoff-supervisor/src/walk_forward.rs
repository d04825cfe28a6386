//! Walk-forward analysis (spec.md §4.F): partitions a date range into
//! rolling train/validate window pairs, flags degradation when the
//! validate/train performance ratio dips below threshold, and summarizes
//! cross-window stability.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wyckoff_core::time::Timeframe;

#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub train_months: i64,
    pub validate_months: i64,
    pub degradation_threshold: Decimal,
}

impl WalkForwardConfig {
    pub fn defaults_for(symbol: impl Into<String>, timeframe: Timeframe, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { symbol: symbol.into(), timeframe, start, end, train_months: 6, validate_months: 3, degradation_threshold: dec!(0.80) }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err("start must precede end".into());
        }
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowBounds {
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub validate_start: DateTime<Utc>,
    pub validate_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub validate_start: DateTime<Utc>,
    pub validate_end: DateTime<Utc>,
    pub train_metric: Decimal,
    pub validate_metric: Decimal,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub run_id: Uuid,
    pub symbol: String,
    pub windows: Vec<WalkForwardWindow>,
    pub stability_score: Decimal,
    pub degraded_window_count: usize,
}

/// Rolling `[train, validate]` window pairs covering `[config.start,
/// config.end)`. A trailing partial pair that would overrun `end` is
/// dropped rather than truncated.
pub fn partition_windows(config: &WalkForwardConfig) -> Vec<WindowBounds> {
    let mut windows = Vec::new();
    let mut cursor = config.start;
    loop {
        let train_end = cursor + ChronoDuration::days(config.train_months * 30);
        let validate_end = train_end + ChronoDuration::days(config.validate_months * 30);
        if validate_end > config.end {
            break;
        }
        windows.push(WindowBounds { train_start: cursor, train_end, validate_start: train_end, validate_end });
        cursor = train_end;
    }
    windows
}

/// A window degrades when the validate-side metric drops below
/// `degradation_threshold` times the train-side metric. A non-positive
/// train metric can't establish a ratio and is never flagged.
pub fn evaluate_window(bounds: WindowBounds, train_metric: Decimal, validate_metric: Decimal, degradation_threshold: Decimal) -> WalkForwardWindow {
    let degraded = train_metric > Decimal::ZERO && (validate_metric / train_metric) < degradation_threshold;
    WalkForwardWindow {
        train_start: bounds.train_start,
        train_end: bounds.train_end,
        validate_start: bounds.validate_start,
        validate_end: bounds.validate_end,
        train_metric,
        validate_metric,
        degraded,
    }
}

/// Coefficient of variation (population stddev / mean) of the
/// validate-side metric across windows. A zero or empty mean yields zero
/// rather than dividing by it.
pub fn stability_score(windows: &[WalkForwardWindow]) -> Decimal {
    if windows.is_empty() {
        return Decimal::ZERO;
    }
    let values: Vec<Decimal> = windows.iter().map(|w| w.validate_metric).collect();
    let n = Decimal::from(values.len());
    let mean: Decimal = values.iter().sum::<Decimal>() / n;
    if mean == Decimal::ZERO {
        return Decimal::ZERO;
    }
    let variance: Decimal = values.iter().map(|v| (*v - mean) * (*v - mean)).sum::<Decimal>() / n;
    (decimal_sqrt(variance) / mean).abs()
}

/// Newton's method to a fixed 20 iterations; avoids bringing in a
/// floating-point sqrt for a value that must stay exact-decimal.
fn decimal_sqrt(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = value;
    for _ in 0..20 {
        guess = (guess + value / guess) / dec!(2);
    }
    guess
}

pub fn summarize(run_id: Uuid, symbol: &str, windows: Vec<WalkForwardWindow>) -> WalkForwardResult {
    let degraded_window_count = windows.iter().filter(|w| w.degraded).count();
    let stability_score = stability_score(&windows);
    WalkForwardResult { run_id, symbol: symbol.to_string(), windows, stability_score, degraded_window_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partitions_cover_the_full_range_without_overrun() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let config = WalkForwardConfig::defaults_for("AAPL", Timeframe::D1, start, end);
        let windows = partition_windows(&config);
        assert!(!windows.is_empty());
        for window in &windows {
            assert!(window.validate_end <= end);
        }
    }

    #[test]
    fn ratio_below_threshold_is_degraded() {
        let bounds = WindowBounds { train_start: Utc::now(), train_end: Utc::now(), validate_start: Utc::now(), validate_end: Utc::now() };
        let window = evaluate_window(bounds, dec!(2.0), dec!(1.0), dec!(0.80));
        assert!(window.degraded);
    }

    #[test]
    fn identical_metrics_are_perfectly_stable() {
        let bounds = WindowBounds { train_start: Utc::now(), train_end: Utc::now(), validate_start: Utc::now(), validate_end: Utc::now() };
        let windows = vec![
            evaluate_window(bounds, dec!(1.0), dec!(1.0), dec!(0.80)),
            evaluate_window(bounds, dec!(1.0), dec!(1.0), dec!(0.80)),
        ];
        assert_eq!(stability_score(&windows), Decimal::ZERO);
    }
}
