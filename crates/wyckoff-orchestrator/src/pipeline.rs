//! The 7-stage analysis pipeline (spec.md §6): ingest, volume analysis,
//! range detection, event collection (SC/AR/ST), phase classification,
//! pattern detection (Spring/SOS/LPS), campaign aggregation and signal
//! generation. Stages A-E run strictly in order on one logical task; across
//! concurrent symbols no ordering is promised (spec.md §5).

use crate::events::{AnalysisOutcome, PipelineEvent, StageResult, StageSummary};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, warn};
use uuid::Uuid;
use wyckoff_campaign::{add_pattern, calculate_position_size, check_portfolio_limits, recompute_risk_metadata, CampaignStore};
use wyckoff_config::{CampaignDefaults, DetectionConfig, PipelineConfig, RiskConfig};
use wyckoff_core::asset::AssetClass;
use wyckoff_core::bar::OhlcvBar;
use wyckoff_core::campaign::{Campaign, CampaignState};
use wyckoff_core::circuit_breaker::CircuitBreaker;
use wyckoff_core::collaborators::{AssetClassifier, MarketDataProvider};
use wyckoff_core::error::WyckoffError;
use wyckoff_core::pattern::Pattern;
use wyckoff_core::phase::{PhaseEvents, WyckoffPhase};
use wyckoff_core::range::TradingRange;
use wyckoff_core::signal::TradeSignal;
use wyckoff_core::time::Timeframe;
use wyckoff_patterns::scoring::{ConfidenceScorer, EntryType, ScorerFactory, SosScoreInputs};
use wyckoff_ranges::{RangeDetector, RangeDetectorConfig};

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Owns the per-symbol campaign stores and the cross-detector circuit
/// breaker. One engine serves all `analyze_symbol`/`analyze_symbols` calls
/// for a process.
pub struct PipelineEngine {
    market_data: Arc<dyn MarketDataProvider>,
    classifier: Arc<dyn AssetClassifier>,
    breaker: CircuitBreaker,
    detection: DetectionConfig,
    risk: RiskConfig,
    pipeline: PipelineConfig,
    range_detector: RangeDetector,
    campaigns: Mutex<HashMap<(String, Timeframe), CampaignStore>>,
}

impl PipelineEngine {
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        classifier: Arc<dyn AssetClassifier>,
        detection: DetectionConfig,
        risk: RiskConfig,
        pipeline: PipelineConfig,
    ) -> Self {
        Self {
            market_data,
            classifier,
            breaker: CircuitBreaker::new(pipeline.circuit_breaker_failure_threshold, pipeline.circuit_breaker_window),
            detection,
            risk,
            pipeline,
            range_detector: RangeDetector::new(RangeDetectorConfig::default()),
            campaigns: Mutex::new(HashMap::new()),
        }
    }

    /// Wraps a fallible detector call with the circuit breaker: open
    /// breakers bypass the call entirely (recorded as a failed detector);
    /// an `Err` result records a failure but the pipeline degrades rather
    /// than aborting (spec.md §7 DetectorError).
    fn guarded<T, E: std::fmt::Display>(&self, name: &str, failed: &mut Vec<String>, call: impl FnOnce() -> Result<T, E>) -> Option<T> {
        let now = Instant::now();
        if self.breaker.is_open(name, now) {
            failed.push(format!("{name}: circuit open"));
            return None;
        }
        match call() {
            Ok(value) => {
                self.breaker.record_success(name);
                Some(value)
            }
            Err(err) => {
                self.breaker.record_failure(name, now);
                error!(detector = name, %err, "detector fault, degrading");
                failed.push(format!("{name}: {err}"));
                None
            }
        }
    }

    /// Runs the full pipeline for one symbol and returns every signal it
    /// produced, plus the event trace for observability.
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AnalysisOutcome, WyckoffError> {
        let correlation_id = Uuid::new_v4();
        let mut events = Vec::new();
        let mut stage_results: Vec<StageSummary> = Vec::new();
        let asset_class = self.classifier.classify(symbol);

        // Stage 1: ingest.
        let stage_started = Instant::now();
        let bars = self
            .market_data
            .fetch_historical(symbol, start, end, timeframe, Some(asset_class))
            .await?;
        events.push(PipelineEvent::BarIngested {
            correlation_id,
            symbol: symbol.to_string(),
            bar_count: bars.len(),
            elapsed_ms: elapsed_ms(stage_started),
        });

        // Stage 2: volume analysis.
        let stage_started = Instant::now();
        let mut failed = Vec::new();
        let volume_analyses = self
            .guarded("volume_analyzer", &mut failed, || {
                if timeframe.is_intraday() {
                    wyckoff_volume::analyze_session_relative_volume(&bars)
                } else {
                    wyckoff_volume::analyze_volume(&bars)
                }
            })
            .unwrap_or_default();
        stage_results.push(StageResult::degraded("volume_analysis", Some(()), elapsed_ms(stage_started), failed).summarize());
        events.push(PipelineEvent::VolumeAnalyzed { correlation_id, elapsed_ms: elapsed_ms(stage_started) });

        if volume_analyses.len() != bars.len() {
            return Ok(AnalysisOutcome { correlation_id, symbol: symbol.to_string(), signals: Vec::new(), events, stage_results, generated_at: end });
        }
        let volume_ratios: Vec<Option<Decimal>> = volume_analyses.iter().map(|a| a.volume_ratio).collect();
        let spread_ratios: Vec<Option<Decimal>> = volume_analyses.iter().map(|a| a.spread_ratio).collect();

        // Stage 3: range detection.
        let stage_started = Instant::now();
        let mut failed = Vec::new();
        let range = self.guarded("range_detector", &mut failed, || self.range_detector.detect_range(&bars)).flatten();
        stage_results.push(StageResult::degraded("range_detection", range.clone(), elapsed_ms(stage_started), failed).summarize());
        events.push(PipelineEvent::RangeDetected { correlation_id, range_id: range.as_ref().map(|r| r.id), elapsed_ms: elapsed_ms(stage_started) });

        let Some(range) = range else {
            return Ok(AnalysisOutcome { correlation_id, symbol: symbol.to_string(), signals: Vec::new(), events, stage_results, generated_at: end });
        };

        // Stage 4: event collection (SC, AR, ST) and interim phase.
        let mut phase_events = PhaseEvents::default();
        let mut failed = Vec::new();
        phase_events.sc = self.guarded("selling_climax", &mut failed, || {
            wyckoff_patterns::detect_selling_climax(&bars, &volume_ratios, &spread_ratios)
        }).flatten();

        if let Some(sc) = phase_events.sc.clone() {
            phase_events.ar = self
                .guarded("automatic_rally", &mut failed, || wyckoff_patterns::detect_automatic_rally(&bars, &sc, &volume_ratios))
                .flatten();

            if let Some(ar) = phase_events.ar.clone() {
                events.push(PipelineEvent::PatternDetected { correlation_id, kind: "automatic_rally", bar_index: ar.bar_index, elapsed_ms: 0 });
                let mut test_count = 0u32;
                loop {
                    test_count += 1;
                    let found = self
                        .guarded("secondary_test", &mut failed, || {
                            wyckoff_patterns::detect_secondary_test(&bars, &sc, &ar, &volume_ratios, test_count)
                        })
                        .flatten();
                    match found {
                        Some(st) => {
                            events.push(PipelineEvent::PatternDetected { correlation_id, kind: "secondary_test", bar_index: st.bar_index, elapsed_ms: 0 });
                            phase_events.st.push(st);
                            if phase_events.st.len() >= 5 {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        // Stage 5: phase classification (interim, pre-Spring) gates Spring
        // eligibility; B is complete once SC+AR+>=1 ST are present.
        let b_complete = phase_events.sc.is_some() && phase_events.ar.is_some() && !phase_events.st.is_empty();

        // Stage 6: pattern detection (Spring, SOS, LPS).
        if b_complete {
            if let Some(creek) = range.creek.clone() {
                let scorer = ScorerFactory::for_asset_class(asset_class);
                let declining = volume_trend_declining(&phase_events.st);
                let outcome = self.guarded("spring", &mut failed, || {
                    wyckoff_patterns::detect_spring(&bars, WyckoffPhase::C, &creek, &volume_ratios, &self.detection, scorer.as_ref(), declining)
                });
                if let Some(outcome) = outcome {
                    match outcome {
                        wyckoff_patterns::SpringOutcome::Detected(spring) => {
                            events.push(PipelineEvent::PatternDetected { correlation_id, kind: "spring", bar_index: spring.bar_index, elapsed_ms: 0 });
                            phase_events.spring = Some(spring);
                        }
                        wyckoff_patterns::SpringOutcome::RangeInvalidated { bar_index } => {
                            warn!(%symbol, bar_index, "range invalidated by Spring breakdown");
                        }
                        wyckoff_patterns::SpringOutcome::None => {}
                    }
                }
            }
        }

        if let Some(ice) = range.ice.clone() {
            let search_start = phase_events
                .spring
                .as_ref()
                .map(|s| s.bar_index + 1)
                .or_else(|| phase_events.ar.as_ref().map(|a| a.bar_index))
                .unwrap_or(range.start_index);

            let sos = self
                .guarded("sign_of_strength", &mut failed, || {
                    wyckoff_patterns::detect_sign_of_strength(&bars, ice.price, &volume_ratios, &spread_ratios, search_start)
                })
                .flatten();

            if let Some(mut sos) = sos {
                let scorer = ScorerFactory::for_asset_class(asset_class);
                let entry_type = if phase_events.spring.is_some() { EntryType::Lps } else { EntryType::Direct };
                let duration_score = duration_fraction(&range, sos.bar_index);
                sos.confidence = scorer.calculate_sos_confidence(SosScoreInputs {
                    volume_ratio: sos.volume_ratio,
                    spread_ratio: sos.spread_ratio,
                    close_position: sos.close_position,
                    breakout_pct: sos.breakout_pct,
                    duration_score,
                    lps_held: false,
                    phase_bonus_eligible: phase_events.spring.is_some(),
                    entry_type,
                });
                events.push(PipelineEvent::PatternDetected { correlation_id, kind: "sign_of_strength", bar_index: sos.bar_index, elapsed_ms: 0 });

                let lps = self
                    .guarded("last_point_of_support", &mut failed, || {
                        wyckoff_patterns::detect_last_point_of_support(&bars, &sos, ice.price, &volume_ratios)
                    })
                    .flatten();
                if let Some(lps) = lps.clone() {
                    events.push(PipelineEvent::PatternDetected { correlation_id, kind: "last_point_of_support", bar_index: lps.bar_index, elapsed_ms: 0 });
                    phase_events.continuation_confirmed = lps.held_support;
                }
                phase_events.lps = lps;
                phase_events.sos = Some(sos);
            }
        }

        // Stage 7: final phase classification, campaign aggregation, signal
        // generation.
        let stage_started = Instant::now();
        let classification = wyckoff_phase::classify_phase(&range, phase_events.clone())
            .map_err(|e| WyckoffError::Detector { detector: "phase_classifier".into(), message: e.to_string() })?;
        stage_results.push(StageResult::degraded("phase_classification", Some(classification.phase), elapsed_ms(stage_started), failed.clone()).summarize());
        events.push(PipelineEvent::PhaseDetected {
            correlation_id,
            phase: classification.phase,
            confidence: classification.confidence,
            elapsed_ms: elapsed_ms(stage_started),
        });

        if !failed.is_empty() {
            for detector in &failed {
                events.push(PipelineEvent::DetectorFailed { correlation_id, detector: detector.clone(), message: detector.clone(), elapsed_ms: 0 });
            }
        }

        if !classification.trading_allowed {
            return Ok(AnalysisOutcome { correlation_id, symbol: symbol.to_string(), signals: Vec::new(), events, stage_results, generated_at: end });
        }

        let campaign_patterns = ordered_campaign_patterns(&phase_events);
        if campaign_patterns.is_empty() {
            return Ok(AnalysisOutcome { correlation_id, symbol: symbol.to_string(), signals: Vec::new(), events, stage_results, generated_at: end });
        }

        let defaults = CampaignDefaults::for_timeframe(timeframe);
        let latest_price = bars.last().map(|b| b.close).unwrap_or(Decimal::ZERO);
        let signal = self.aggregate_campaign_and_size(symbol, timeframe, asset_class, campaign_patterns, &defaults, latest_price, classification.phase, end);

        let signals = match signal {
            Some(signal) => {
                events.push(PipelineEvent::SignalGenerated { correlation_id, signal_id: signal.id, elapsed_ms: 0 });
                vec![signal]
            }
            None => Vec::new(),
        };

        Ok(AnalysisOutcome { correlation_id, symbol: symbol.to_string(), signals, events, stage_results, generated_at: end })
    }

    /// Appends the campaign's patterns, recomputes risk metadata, checks
    /// portfolio admission, and emits a `TradeSignal` when confidence and
    /// admission both clear.
    #[allow(clippy::too_many_arguments)]
    fn aggregate_campaign_and_size(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        asset_class: AssetClass,
        patterns: Vec<Pattern>,
        defaults: &CampaignDefaults,
        latest_price: Decimal,
        phase: WyckoffPhase,
        now: DateTime<Utc>,
    ) -> Option<TradeSignal> {
        let mut stores = self.campaigns.lock().expect("campaign store lock poisoned");
        let store = stores.entry((symbol.to_string(), timeframe)).or_default();

        let active_id = store.get_active_campaigns().first().map(|c| c.id);

        let campaign_id = match active_id {
            Some(id) => id,
            None => {
                let campaign = Campaign::new(Uuid::new_v4(), symbol, now);
                let id = campaign.id;
                store.add(campaign);
                id
            }
        };

        for pattern in patterns {
            if let Some(campaign) = store.get_mut(campaign_id) {
                add_pattern(campaign, pattern, now, defaults);
            }
        }

        let campaign = store.get_mut(campaign_id)?;
        recompute_risk_metadata(campaign, latest_price);
        wyckoff_campaign::update_volume_telemetry(campaign);

        if campaign.strength_score < dec!(0.5) {
            return None;
        }

        let active_count = store.count_by_state(CampaignState::Active);
        let current_heat_pct = Decimal::ZERO; // single-process engine; cross-symbol heat tracked by the caller.
        let campaign = store.get(campaign_id)?;
        let prospective_heat_pct = if self.risk.account_equity > Decimal::ZERO {
            campaign.dollar_risk / self.risk.account_equity * dec!(100)
        } else {
            Decimal::ZERO
        };

        let admission = check_portfolio_limits(active_count, defaults.max_concurrent as usize, current_heat_pct, prospective_heat_pct, self.risk.max_portfolio_heat_pct);
        if !admission.admitted {
            warn!(%symbol, reason = ?admission.reason, "campaign denied portfolio admission");
            return None;
        }

        let position_size = calculate_position_size(self.risk.account_equity, self.risk.risk_pct_per_trade, campaign.risk_per_share).ok()?;
        if position_size <= Decimal::ZERO {
            return None;
        }

        let campaign = store.get_mut(campaign_id)?;
        campaign.position_size = position_size;
        campaign.dollar_risk = position_size * campaign.risk_per_share;

        Some(TradeSignal {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            campaign_id,
            asset_class,
            phase,
            pattern_kind: campaign.patterns.last().map(|p| p.kind_name()).unwrap_or("unknown"),
            confidence: campaign
                .patterns
                .last()
                .map(|p| p.confidence_pct())
                .unwrap_or(Decimal::ZERO)
                .round()
                .to_u8()
                .unwrap_or(0),
            entry_price: latest_price,
            stop_price: campaign.support_level,
            target_price: campaign.jump_level,
            position_size,
            generated_at: now,
        })
    }

    /// Snapshot of every campaign tracked for `(symbol, timeframe)`, for
    /// callers (the supervisor's backtest/walk-forward/regression runs)
    /// that need performance statistics rather than just live signals.
    pub fn campaign_snapshot(&self, symbol: &str, timeframe: Timeframe) -> Vec<Campaign> {
        let stores = self.campaigns.lock().expect("campaign store lock poisoned");
        stores.get(&(symbol.to_string(), timeframe)).map(|store| store.all().into_iter().cloned().collect()).unwrap_or_default()
    }

    /// Bounded-concurrency fan-out over multiple symbols (spec.md §6).
    pub async fn analyze_symbols(
        self: &Arc<Self>,
        symbols: &[String],
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HashMap<String, Vec<TradeSignal>> {
        let semaphore = Arc::new(Semaphore::new(self.pipeline.max_concurrent_symbols));
        let mut handles = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let engine = Arc::clone(self);
            let symbol = symbol.clone();
            let permit = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                let outcome = engine.analyze_symbol(&symbol, timeframe, start, end).await;
                (symbol, outcome)
            }));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for handle in handles {
            if let Ok((symbol, outcome)) = handle.await {
                match outcome {
                    Ok(outcome) => {
                        results.insert(symbol, outcome.signals);
                    }
                    Err(err) => {
                        warn!(%symbol, %err, "symbol analysis failed");
                        results.insert(symbol, Vec::new());
                    }
                }
            }
        }
        results
    }
}

/// >=70% of recent test volume ratios declining counts as a declining
/// trend, reusing the same majority rule as the campaign telemetry.
fn volume_trend_declining(tests: &[wyckoff_core::pattern::SecondaryTest]) -> bool {
    if tests.len() < 2 {
        return false;
    }
    let mut declining = 0;
    for pair in tests.windows(2) {
        if pair[1].volume_reduction_pct > pair[0].volume_reduction_pct {
            declining += 1;
        }
    }
    declining * 10 >= (tests.len() - 1) * 7
}

fn duration_fraction(range: &TradingRange, bar_index: usize) -> Decimal {
    let duration = range.duration_bars().max(1);
    let elapsed = bar_index.saturating_sub(range.start_index).min(duration);
    Decimal::from(elapsed) / Decimal::from(duration)
}

/// Campaign sequence validity (spec.md §4.E) only covers Spring/AR/SOS/LPS
/// transitions; Secondary Tests inform phase classification but are never
/// appended to a campaign's own pattern sequence.
fn ordered_campaign_patterns(events: &PhaseEvents) -> Vec<Pattern> {
    let mut patterns: Vec<Pattern> = Vec::new();
    if let Some(ar) = events.ar.clone() {
        patterns.push(Pattern::AutomaticRally(ar));
    }
    if let Some(spring) = events.spring.clone() {
        patterns.push(Pattern::Spring(spring));
    }
    if let Some(sos) = events.sos.clone() {
        patterns.push(Pattern::SignOfStrength(sos));
    }
    if let Some(lps) = events.lps.clone() {
        patterns.push(Pattern::LastPointOfSupport(lps));
    }
    patterns.sort_by_key(|p| p.bar_index());
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wyckoff_core::collaborators::MarketDataProvider;
    use wyckoff_testkit::{FakeMarketDataProvider, FixedAssetClassifier};

    fn engine(market_data: Arc<dyn MarketDataProvider>) -> PipelineEngine {
        PipelineEngine::new(
            market_data,
            Arc::new(FixedAssetClassifier::new(AssetClass::Stock)),
            DetectionConfig::default(),
            RiskConfig::default(),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn unseeded_symbol_surfaces_data_unavailable() {
        let market_data: Arc<dyn MarketDataProvider> = Arc::new(FakeMarketDataProvider::new());
        let engine = engine(market_data);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let result = engine.analyze_symbol("GHOST", Timeframe::D1, start, end).await;
        assert!(matches!(result, Err(WyckoffError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn flat_series_with_no_range_yields_no_signals() {
        let provider = FakeMarketDataProvider::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<OhlcvBar> = (0..60)
            .map(|i| OhlcvBar {
                symbol: "FLAT".into(),
                timeframe: Timeframe::D1,
                timestamp: start + chrono::Duration::days(i),
                open: dec!(100),
                high: dec!(100.5),
                low: dec!(99.5),
                close: dec!(100),
                volume: 1_000_000,
            })
            .collect();
        let end = start + chrono::Duration::days(59);
        provider.seed("FLAT", Timeframe::D1, bars);

        let market_data: Arc<dyn MarketDataProvider> = Arc::new(provider);
        let engine = engine(market_data);
        let outcome = engine.analyze_symbol("FLAT", Timeframe::D1, start, end).await.unwrap();
        assert!(outcome.signals.is_empty());
    }
}
