//! Component F: the Analysis Supervisor (spec.md §4.F). Sits above
//! `wyckoff-orchestrator`'s pipeline engine, turning a single
//! `analyze_symbol` call into the four run kinds exposed over HTTP:
//! preview (disabled), full backtest, walk-forward, and regression.

pub mod admission;
pub mod backtest;
pub mod baseline;
pub mod error;
pub mod regression;
pub mod registry;
pub mod supervisor;
pub mod walk_forward;

pub use admission::{admit, AdmissionLimits};
pub use backtest::{run_full_backtest, BacktestResult, FullBacktestConfig};
pub use baseline::BaselineStore;
pub use error::SupervisorError;
pub use regression::{aggregate_metric, compare_to_baseline, MetricDelta, RegressionConfig, RegressionResult};
pub use registry::RunRegistry;
pub use supervisor::AnalysisSupervisor;
pub use walk_forward::{evaluate_window, partition_windows, stability_score, summarize, WalkForwardConfig, WalkForwardResult, WalkForwardWindow, WindowBounds};
