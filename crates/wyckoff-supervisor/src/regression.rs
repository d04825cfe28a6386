//! Regression testing (spec.md §4.F): a full backtest per symbol,
//! aggregated and compared against the current baseline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use wyckoff_core::run::{RegressionBaseline, RegressionStatus};
use wyckoff_core::time::Timeframe;

#[derive(Debug, Clone)]
pub struct RegressionConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub degradation_threshold_pct: Decimal,
}

impl RegressionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.symbols.is_empty() {
            return Err("symbols must not be empty".into());
        }
        if self.start >= self.end {
            return Err("start must precede end".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub baseline_value: Decimal,
    pub current_value: Decimal,
    pub percent_change: Decimal,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionResult {
    pub run_id: Uuid,
    pub status: RegressionStatus,
    pub aggregate_metrics: HashMap<String, Decimal>,
    pub per_symbol_metrics: HashMap<String, HashMap<String, Decimal>>,
    pub deltas: Vec<MetricDelta>,
}

/// Unweighted mean of `metric` across every symbol that reported it.
pub fn aggregate_metric(per_symbol: &HashMap<String, HashMap<String, Decimal>>, metric: &str) -> Decimal {
    let values: Vec<Decimal> = per_symbol.values().filter_map(|m| m.get(metric).copied()).collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// Compares `aggregate` against `baseline`'s metrics of the same name.
/// Metrics the baseline never tracked are skipped rather than treated as a
/// zero-baseline regression. Without a baseline, reports BASELINE_NOT_SET.
pub fn compare_to_baseline(aggregate: &HashMap<String, Decimal>, baseline: Option<&RegressionBaseline>, threshold_pct: Decimal) -> (RegressionStatus, Vec<MetricDelta>) {
    let Some(baseline) = baseline else {
        return (RegressionStatus::BaselineNotSet, Vec::new());
    };

    let mut deltas = Vec::new();
    let mut any_degraded = false;
    let mut metric_names: Vec<&String> = aggregate.keys().collect();
    metric_names.sort();
    for metric in metric_names {
        let current_value = aggregate[metric];
        let Some(&baseline_value) = baseline.aggregate_metrics.get(metric) else {
            continue;
        };
        let percent_change = if baseline_value != Decimal::ZERO {
            ((current_value - baseline_value) / baseline_value) * dec!(100)
        } else {
            Decimal::ZERO
        };
        let degraded = percent_change.abs() > threshold_pct;
        any_degraded = any_degraded || degraded;
        deltas.push(MetricDelta { metric: metric.clone(), baseline_value, current_value, percent_change, degraded });
    }

    let status = if any_degraded { RegressionStatus::Fail } else { RegressionStatus::Pass };
    (status, deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(metrics: HashMap<String, Decimal>) -> RegressionBaseline {
        RegressionBaseline {
            baseline_id: Uuid::new_v4(),
            source_test_id: Uuid::new_v4(),
            codebase_version: "test".into(),
            aggregate_metrics: metrics,
            per_symbol_metrics: HashMap::new(),
            established_at: chrono::Utc::now(),
            is_current: true,
        }
    }

    #[test]
    fn missing_baseline_reports_baseline_not_set() {
        let mut aggregate = HashMap::new();
        aggregate.insert("win_rate".to_string(), dec!(0.55));
        let (status, deltas) = compare_to_baseline(&aggregate, None, dec!(10));
        assert_eq!(status, RegressionStatus::BaselineNotSet);
        assert!(deltas.is_empty());
    }

    #[test]
    fn large_drop_fails_the_run() {
        let mut baseline_metrics = HashMap::new();
        baseline_metrics.insert("win_rate".to_string(), dec!(0.60));
        let mut aggregate = HashMap::new();
        aggregate.insert("win_rate".to_string(), dec!(0.40));

        let baseline = baseline(baseline_metrics);
        let (status, deltas) = compare_to_baseline(&aggregate, Some(&baseline), dec!(10));
        assert_eq!(status, RegressionStatus::Fail);
        assert!(deltas[0].degraded);
    }

    #[test]
    fn small_drift_passes() {
        let mut baseline_metrics = HashMap::new();
        baseline_metrics.insert("win_rate".to_string(), dec!(0.60));
        let mut aggregate = HashMap::new();
        aggregate.insert("win_rate".to_string(), dec!(0.605));

        let baseline = baseline(baseline_metrics);
        let (status, _) = compare_to_baseline(&aggregate, Some(&baseline), dec!(10));
        assert_eq!(status, RegressionStatus::Pass);
    }
}
