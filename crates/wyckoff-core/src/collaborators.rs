//! External collaborator interfaces (spec.md §6). The core consumes these
//! as traits; concrete implementations (live market-data adapters, SQL
//! repositories, WebSocket broadcasters) are external to this workspace —
//! only in-memory test doubles ship here (`wyckoff-testkit`).

use crate::asset::AssetClass;
use crate::bar::OhlcvBar;
use crate::error::WyckoffError;
use crate::run::ProgressUpdate;
use crate::time::Timeframe;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Fetches historical OHLCV bars, with a fallback chain over providers. On
/// exhaustion this raises `WyckoffError::DataUnavailable`, which the
/// supervisor converts to a FAILED run status. No silent synthetic
/// fallback is permitted.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: Timeframe,
        asset_class: Option<AssetClass>,
    ) -> Result<Vec<OhlcvBar>, WyckoffError>;
}

/// One repository per persisted entity kind (Campaigns, TradingRanges,
/// Patterns, Signals, BacktestResults, WalkForwardResults,
/// RegressionTestResults, RegressionBaselines). `save_result` commits
/// internally — callers never manage a transaction across this boundary.
#[async_trait]
pub trait ResultRepository<T>: Send + Sync
where
    T: Send + Sync + Serialize,
{
    async fn save_result(&self, result: &T) -> Result<Uuid, WyckoffError>;
    async fn get_result(&self, id: Uuid) -> Result<Option<T>, WyckoffError>;
    async fn list_results(&self, limit: usize, offset: usize) -> Result<Vec<T>, WyckoffError>;
}

/// Publishes progress for a running background task. Implementations
/// include a WebSocket broadcaster and a REST-polling snapshot store;
/// both are interchangeable from the supervisor's perspective.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, update: ProgressUpdate);
}

/// Asset-class classification, wrapping the heuristic in `asset::classify_symbol`
/// behind a trait so a collaborator can swap in exchange-metadata-backed
/// classification without touching detector code.
pub trait AssetClassifier: Send + Sync {
    fn classify(&self, symbol: &str) -> AssetClass;
}

/// Default classifier using the 6-letter-alpha heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAssetClassifier;

impl AssetClassifier for HeuristicAssetClassifier {
    fn classify(&self, symbol: &str) -> AssetClass {
        crate::asset::classify_symbol(symbol)
    }
}
