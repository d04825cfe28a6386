//! `VolumeCache`: O(1) ratio lookup by bar timestamp for multi-pass
//! detection (spec.md §4.A). Owned by a single detection pass — never
//! shared across concurrent tasks (spec.md §5).

use crate::analyzer::{analyze_volume, VolumeAnalysis};
use crate::error::VolumeError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use wyckoff_core::bar::OhlcvBar;

pub struct VolumeCache {
    by_timestamp: HashMap<DateTime<Utc>, VolumeAnalysis>,
}

impl VolumeCache {
    /// Builds a cache from a bar slice. Must be rebuilt (not reused) if the
    /// input sequence is re-sliced — the cache has no way to detect a
    /// stale index otherwise.
    pub fn build(bars: &[OhlcvBar]) -> Result<Self, VolumeError> {
        let analysis = analyze_volume(bars)?;
        let by_timestamp = bars
            .iter()
            .zip(analysis)
            .map(|(bar, a)| (bar.timestamp, a))
            .collect();
        Ok(Self { by_timestamp })
    }

    pub fn get(&self, timestamp: DateTime<Utc>) -> Option<&VolumeAnalysis> {
        self.by_timestamp.get(&timestamp)
    }

    pub fn len(&self) -> usize {
        self.by_timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_timestamp.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wyckoff_core::time::Timeframe;

    #[test]
    fn lookup_by_timestamp() {
        let bars: Vec<_> = (0..25)
            .map(|i| OhlcvBar {
                symbol: "TEST".into(),
                timeframe: Timeframe::D1,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i),
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100.5),
                volume: 1_000_000,
            })
            .collect();
        let cache = VolumeCache::build(&bars).unwrap();
        assert_eq!(cache.len(), 25);
        let analysis = cache.get(bars[20].timestamp).unwrap();
        assert_eq!(analysis.bar_index, 20);
    }
}
