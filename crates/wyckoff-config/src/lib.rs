//! Configuration collaborator (spec.md §6). Follows the teacher's
//! `env::var(..).unwrap_or_else(..)` `from_env` idiom, generalized across
//! detection, campaign, supervisor, and risk settings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<Decimal>().ok())
        .unwrap_or(default)
}

/// Detection thresholds (spec.md §6).
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub min_phase_confidence: u8,
    pub min_range_quality_score: Decimal,
    pub session_filter_enabled: bool,
    pub session_confidence_scoring_enabled: bool,
    pub store_rejected_patterns: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_phase_confidence: 70,
            min_range_quality_score: dec!(60),
            session_filter_enabled: false,
            session_confidence_scoring_enabled: false,
            store_rejected_patterns: false,
        }
    }
}

impl DetectionConfig {
    pub fn from_env() -> Self {
        Self {
            min_phase_confidence: env_or("WYCKOFF_MIN_PHASE_CONFIDENCE", 70),
            min_range_quality_score: env_decimal("WYCKOFF_MIN_RANGE_QUALITY", dec!(60)),
            session_filter_enabled: env_or("WYCKOFF_SESSION_FILTER_ENABLED", false),
            session_confidence_scoring_enabled: env_or(
                "WYCKOFF_SESSION_CONFIDENCE_SCORING_ENABLED",
                false,
            ),
            store_rejected_patterns: env_or("WYCKOFF_STORE_REJECTED_PATTERNS", false),
        }
    }
}

/// Campaign lifecycle defaults for one timeframe tier (spec.md §4.E).
#[derive(Debug, Clone, Copy)]
pub struct CampaignDefaults {
    pub campaign_window_hours: u32,
    pub max_pattern_gap_hours: u32,
    pub min_patterns_for_active: u32,
    pub expiration_hours: u32,
    pub max_concurrent: u32,
    pub max_portfolio_heat_pct: Decimal,
}

impl CampaignDefaults {
    /// Intraday (<=1h timeframe) defaults.
    pub fn intraday() -> Self {
        Self {
            campaign_window_hours: 48,
            max_pattern_gap_hours: 48,
            min_patterns_for_active: 2,
            expiration_hours: 72,
            max_concurrent: 3,
            max_portfolio_heat_pct: dec!(10.0),
        }
    }

    /// Daily-timeframe defaults.
    pub fn daily() -> Self {
        Self {
            campaign_window_hours: 240,
            max_pattern_gap_hours: 120,
            min_patterns_for_active: 2,
            expiration_hours: 360,
            max_concurrent: 5,
            max_portfolio_heat_pct: dec!(10.0),
        }
    }

    pub fn for_timeframe(timeframe: wyckoff_core::Timeframe) -> Self {
        if timeframe.is_intraday() {
            Self::intraday()
        } else {
            Self::daily()
        }
    }
}

/// Admission control and registry settings for the Analysis Supervisor
/// (spec.md §4.F, §6).
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_entries: usize,
    pub entry_ttl: Duration,
    pub max_concurrent_preview: usize,
    pub max_concurrent_walk_forward: usize,
    pub max_concurrent_regression: usize,
    /// Preview is gated off by policy (spec.md §4.F, §9 Open Question).
    pub preview_enabled: bool,
    pub default_lookback_bars: usize,
    pub degradation_threshold: Decimal,
    /// Wall-clock budget for one background run before it is reported
    /// TIMEOUT with whatever partial progress was published (spec.md §7).
    pub run_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            entry_ttl: Duration::from_secs(3600),
            max_concurrent_preview: 5,
            max_concurrent_walk_forward: 3,
            max_concurrent_regression: 3,
            preview_enabled: false,
            default_lookback_bars: 500,
            degradation_threshold: dec!(0.80),
            run_timeout: Duration::from_secs(1800),
        }
    }
}

impl SupervisorConfig {
    pub fn from_env() -> Self {
        Self {
            max_entries: env_or("WYCKOFF_MAX_ENTRIES", 1000),
            entry_ttl: Duration::from_secs(env_or("WYCKOFF_ENTRY_TTL_SECONDS", 3600)),
            max_concurrent_preview: env_or("WYCKOFF_MAX_CONCURRENT_PREVIEW", 5),
            max_concurrent_walk_forward: env_or("WYCKOFF_MAX_CONCURRENT_WALK_FORWARD", 3),
            max_concurrent_regression: env_or("WYCKOFF_MAX_CONCURRENT_REGRESSION", 3),
            preview_enabled: env_or("WYCKOFF_PREVIEW_ENABLED", false),
            default_lookback_bars: env_or("WYCKOFF_DEFAULT_LOOKBACK_BARS", 500),
            degradation_threshold: env_decimal("WYCKOFF_DEGRADATION_THRESHOLD", dec!(0.80)),
            run_timeout: Duration::from_secs(env_or("WYCKOFF_RUN_TIMEOUT_SECONDS", 1800)),
        }
    }
}

/// Portfolio and position-sizing risk caps (spec.md §6).
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub account_equity: Decimal,
    pub risk_pct_per_trade: Decimal,
    pub max_portfolio_heat_pct: Decimal,
    pub max_campaign_risk_pct: Decimal,
    pub max_correlated_risk_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_equity: dec!(100_000),
            risk_pct_per_trade: dec!(2.0),
            max_portfolio_heat_pct: dec!(10.0),
            max_campaign_risk_pct: dec!(5.0),
            max_correlated_risk_pct: dec!(6.0),
        }
    }
}

impl RiskConfig {
    pub fn from_env() -> Self {
        Self {
            account_equity: env_decimal("WYCKOFF_ACCOUNT_EQUITY", dec!(100_000)),
            risk_pct_per_trade: env_decimal("WYCKOFF_RISK_PCT_PER_TRADE", dec!(2.0)),
            max_portfolio_heat_pct: env_decimal("WYCKOFF_MAX_PORTFOLIO_HEAT_PCT", dec!(10.0)),
            max_campaign_risk_pct: env_decimal("WYCKOFF_MAX_CAMPAIGN_RISK_PCT", dec!(5.0)),
            max_correlated_risk_pct: env_decimal("WYCKOFF_MAX_CORRELATED_RISK_PCT", dec!(6.0)),
        }
    }
}

/// Orchestrator pipeline settings (spec.md §6).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_concurrent_symbols: usize,
    /// Consecutive detector failures before its circuit breaker opens.
    pub circuit_breaker_failure_threshold: usize,
    pub circuit_breaker_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_symbols: 8,
            circuit_breaker_failure_threshold: 3,
            circuit_breaker_window: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            max_concurrent_symbols: env_or("WYCKOFF_MAX_CONCURRENT_SYMBOLS", 8),
            circuit_breaker_failure_threshold: env_or("WYCKOFF_BREAKER_FAILURE_THRESHOLD", 3),
            circuit_breaker_window: Duration::from_secs(env_or("WYCKOFF_BREAKER_WINDOW_SECONDS", 60)),
        }
    }
}

/// Aggregate settings loaded once at process start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub detection: DetectionConfig,
    pub supervisor: SupervisorConfig,
    pub risk: RiskConfig,
    pub pipeline: PipelineConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            detection: DetectionConfig::from_env(),
            supervisor: SupervisorConfig::from_env(),
            risk: RiskConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            supervisor: SupervisorConfig::default(),
            risk: RiskConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let d = DetectionConfig::default();
        assert_eq!(d.min_phase_confidence, 70);

        let s = SupervisorConfig::default();
        assert_eq!(s.max_entries, 1000);
        assert_eq!(s.entry_ttl, Duration::from_secs(3600));
        assert!(!s.preview_enabled);

        let r = RiskConfig::default();
        assert_eq!(r.risk_pct_per_trade, dec!(2.0));
    }

    #[test]
    fn campaign_defaults_by_timeframe() {
        let intraday = CampaignDefaults::for_timeframe(wyckoff_core::Timeframe::M15);
        assert_eq!(intraday.expiration_hours, 72);
        let daily = CampaignDefaults::for_timeframe(wyckoff_core::Timeframe::D1);
        assert_eq!(daily.expiration_hours, 360);
    }
}
