//! Per-stage results and the optional pipeline event stream
//! (spec.md §6 exposed contracts).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use wyckoff_core::phase::WyckoffPhase;

/// Outcome of one pipeline stage. `output` is `None` both when the stage
/// legitimately found nothing (e.g. no range formed) and when it failed;
/// `success` distinguishes the two.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult<T> {
    pub stage: &'static str,
    pub success: bool,
    pub output: Option<T>,
    pub execution_time_ms: u64,
    pub failed_detectors: Vec<String>,
}

impl<T> StageResult<T> {
    pub fn ok(stage: &'static str, output: Option<T>, execution_time_ms: u64) -> Self {
        Self { stage, success: true, output, execution_time_ms, failed_detectors: Vec::new() }
    }

    /// A stage that ran to completion but had one or more detectors bypassed
    /// by an open circuit breaker or returning a fault is still `success`
    /// (it produced best-effort output); only a hard stage failure is not.
    pub fn degraded(stage: &'static str, output: Option<T>, execution_time_ms: u64, failed_detectors: Vec<String>) -> Self {
        Self { stage, success: true, output, execution_time_ms, failed_detectors }
    }

    pub fn summarize(&self) -> StageSummary {
        StageSummary {
            stage: self.stage,
            success: self.success,
            produced_output: self.output.is_some(),
            execution_time_ms: self.execution_time_ms,
            failed_detectors: self.failed_detectors.clone(),
        }
    }
}

/// Type-erased projection of a `StageResult`, dropping the stage-specific
/// output payload so a whole run's stages can share one serializable list.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: &'static str,
    pub success: bool,
    pub produced_output: bool,
    pub execution_time_ms: u64,
    pub failed_detectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    BarIngested { correlation_id: Uuid, symbol: String, bar_count: usize, elapsed_ms: u64 },
    VolumeAnalyzed { correlation_id: Uuid, elapsed_ms: u64 },
    RangeDetected { correlation_id: Uuid, range_id: Option<Uuid>, elapsed_ms: u64 },
    PhaseDetected { correlation_id: Uuid, phase: WyckoffPhase, confidence: u8, elapsed_ms: u64 },
    PatternDetected { correlation_id: Uuid, kind: &'static str, bar_index: usize, elapsed_ms: u64 },
    SignalGenerated { correlation_id: Uuid, signal_id: Uuid, elapsed_ms: u64 },
    DetectorFailed { correlation_id: Uuid, detector: String, message: String, elapsed_ms: u64 },
}

impl PipelineEvent {
    pub fn correlation_id(&self) -> Uuid {
        match self {
            PipelineEvent::BarIngested { correlation_id, .. }
            | PipelineEvent::VolumeAnalyzed { correlation_id, .. }
            | PipelineEvent::RangeDetected { correlation_id, .. }
            | PipelineEvent::PhaseDetected { correlation_id, .. }
            | PipelineEvent::PatternDetected { correlation_id, .. }
            | PipelineEvent::SignalGenerated { correlation_id, .. }
            | PipelineEvent::DetectorFailed { correlation_id, .. } => *correlation_id,
        }
    }
}

/// Everything produced by one `analyze_symbol` run, for callers that want
/// the full trace rather than just the signals.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub correlation_id: Uuid,
    pub symbol: String,
    pub signals: Vec<wyckoff_core::signal::TradeSignal>,
    pub events: Vec<PipelineEvent>,
    pub stage_results: Vec<StageSummary>,
    pub generated_at: DateTime<Utc>,
}
