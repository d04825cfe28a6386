//! Analysis Supervisor's underlying engine: wires the volume, range,
//! phase, pattern, and campaign crates into the single `analyze_symbol`
//! pipeline described in spec.md §6.

pub mod events;
pub mod pipeline;

pub use events::{AnalysisOutcome, PipelineEvent, StageResult, StageSummary};
pub use pipeline::PipelineEngine;
