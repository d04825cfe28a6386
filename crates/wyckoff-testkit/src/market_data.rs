//! In-memory `MarketDataProvider` test double: serves pre-loaded bars for
//! each symbol, or `DataUnavailable` when the symbol was never seeded — no
//! synthetic fallback, matching the real provider's no-fallback contract
//! (spec.md §6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use wyckoff_core::asset::AssetClass;
use wyckoff_core::bar::OhlcvBar;
use wyckoff_core::collaborators::MarketDataProvider;
use wyckoff_core::error::WyckoffError;
use wyckoff_core::time::Timeframe;

#[derive(Default)]
pub struct FakeMarketDataProvider {
    bars: Mutex<HashMap<(String, Timeframe), Vec<OhlcvBar>>>,
}

impl FakeMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, symbol: &str, timeframe: Timeframe, bars: Vec<OhlcvBar>) {
        self.bars.lock().expect("fake market data lock poisoned").insert((symbol.to_string(), timeframe), bars);
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarketDataProvider {
    async fn fetch_historical(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: Timeframe,
        _asset_class: Option<AssetClass>,
    ) -> Result<Vec<OhlcvBar>, WyckoffError> {
        let bars = self.bars.lock().expect("fake market data lock poisoned");
        let Some(series) = bars.get(&(symbol.to_string(), timeframe)) else {
            return Err(WyckoffError::DataUnavailable { symbol: symbol.to_string(), message: "no seeded series for symbol/timeframe".into() });
        };
        Ok(series.iter().filter(|bar| bar.timestamp >= start && bar.timestamp <= end).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(day: i64) -> OhlcvBar {
        OhlcvBar {
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: 1_000_000,
        }
    }

    #[tokio::test]
    async fn unseeded_symbol_is_data_unavailable() {
        let provider = FakeMarketDataProvider::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let result = provider.fetch_historical("GHOST", start, end, Timeframe::D1, None).await;
        assert!(matches!(result, Err(WyckoffError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn seeded_bars_are_filtered_to_the_requested_window() {
        let provider = FakeMarketDataProvider::new();
        let bars: Vec<OhlcvBar> = (0..30).map(bar).collect();
        provider.seed("TEST", Timeframe::D1, bars);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(10);
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(15);
        let result = provider.fetch_historical("TEST", start, end, Timeframe::D1, None).await.unwrap();
        assert_eq!(result.len(), 6);
    }
}
