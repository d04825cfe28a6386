//! Entities owned by the Analysis Supervisor, component F (spec.md §3,
//! §4.F).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Preview,
    Full,
    WalkForward,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// A record in one of the four in-memory run registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub run_id: Uuid,
    pub kind: RunKind,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub progress: Option<ProgressUpdate>,
    pub error: Option<String>,
    /// Opaque reference to the typed result, populated on success. Kept as
    /// JSON so the registry stays generic across run kinds.
    pub result: Option<serde_json::Value>,
}

impl BacktestRun {
    pub fn new(run_id: Uuid, kind: RunKind, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            kind,
            status: RunStatus::Running,
            created_at,
            progress: None,
            error: None,
            result: None,
        }
    }
}

/// Progress published by a background task via the `ProgressSink`
/// collaborator (spec.md §6). Sequence numbers are monotone per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub run_id: Uuid,
    pub bars_analyzed: u64,
    pub total_bars: u64,
    pub percent_complete: Decimal,
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionStatus {
    Pass,
    Fail,
    BaselineNotSet,
}

/// A named metric tracked for regression comparison (e.g. `win_rate`,
/// `avg_r_multiple`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionBaseline {
    pub baseline_id: Uuid,
    pub source_test_id: Uuid,
    pub codebase_version: String,
    pub aggregate_metrics: HashMap<String, Decimal>,
    pub per_symbol_metrics: HashMap<String, HashMap<String, Decimal>>,
    pub established_at: DateTime<Utc>,
    /// At most one baseline carries `is_current = true` globally.
    pub is_current: bool,
}
