//! Full backtest (spec.md §4.F): runs the analysis pipeline across every
//! symbol over `[start, end)` and aggregates the campaigns it produced
//! into overview/performance statistics, per symbol and in total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;
use wyckoff_campaign::statistics::{overview, performance, Overview, Performance};
use wyckoff_core::time::Timeframe;
use wyckoff_orchestrator::PipelineEngine;

#[derive(Debug, Clone)]
pub struct FullBacktestConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: Decimal,
}

impl FullBacktestConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.start >= self.end {
            return Err("start must precede end".into());
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err("initial_capital must be positive".into());
        }
        if self.symbols.is_empty() {
            return Err("symbols must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub run_id: Uuid,
    pub symbols: Vec<String>,
    pub overview: Overview,
    pub performance: Performance,
    pub per_symbol_metrics: HashMap<String, HashMap<String, Decimal>>,
}

/// Runs `analyze_symbols` once to populate each symbol's campaign store,
/// then aggregates every campaign touched during the run. The signals
/// `analyze_symbols` returns are discarded here; backtesting cares about
/// the campaigns they came from, not the point-in-time signal itself.
/// Takes the engine behind an `Arc` because `analyze_symbols`'s bounded
/// fan-out requires it.
pub async fn run_full_backtest(engine: &std::sync::Arc<PipelineEngine>, run_id: Uuid, config: &FullBacktestConfig) -> BacktestResult {
    engine.analyze_symbols(&config.symbols, config.timeframe, config.start, config.end).await;

    let mut all_campaigns = Vec::new();
    let mut per_symbol_metrics = HashMap::new();
    for symbol in &config.symbols {
        let campaigns = engine.campaign_snapshot(symbol, config.timeframe);
        let refs: Vec<&wyckoff_core::campaign::Campaign> = campaigns.iter().collect();
        let symbol_perf = performance(&refs);
        let mut metrics = HashMap::new();
        metrics.insert("win_rate".to_string(), symbol_perf.win_rate);
        metrics.insert("mean_r".to_string(), symbol_perf.mean_r);
        per_symbol_metrics.insert(symbol.clone(), metrics);
        all_campaigns.extend(campaigns);
    }

    let all_refs: Vec<&wyckoff_core::campaign::Campaign> = all_campaigns.iter().collect();
    BacktestResult {
        run_id,
        symbols: config.symbols.clone(),
        overview: overview(&all_refs),
        performance: performance(&all_refs),
        per_symbol_metrics,
    }
}
