//! Campaign Detector: builds Wyckoff campaigns from pattern sequences,
//! tracks risk and volume telemetry, and reports aggregate statistics
//! (spec.md §4.E).

pub mod error;
pub mod risk;
pub mod state_machine;
pub mod statistics;
pub mod store;
pub mod telemetry;

pub use error::CampaignError;
pub use risk::{calculate_position_size, check_portfolio_limits, recompute_risk_metadata, PortfolioHeatCheck};
pub use state_machine::{add_pattern, evaluate_time_transitions, infer_phase, is_valid_transition, mark_completed, mark_phase_e_complete};
pub use statistics::{
    entry_phase_distribution, exit_phase_distribution, exit_reason_breakdown, overview, pattern_sequence_breakdown, performance,
    Overview, PatternSequenceKind, Performance,
};
pub use store::CampaignStore;
pub use telemetry::update_volume_telemetry;
