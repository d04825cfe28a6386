//! Indexes active ranges by symbol x timeframe (spec.md §4.B). Touch counts
//! are incremented as later bars retest a level within tolerance; soft
//! deletes keep a range addressable by id without matching it further.

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;
use wyckoff_core::range::TradingRange;
use wyckoff_core::time::Timeframe;

#[derive(Default)]
pub struct RangeIndex {
    by_id: HashMap<Uuid, TradingRange>,
    by_symbol_timeframe: HashMap<(String, Timeframe), Vec<Uuid>>,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: TradingRange) {
        let key = (range.symbol.clone(), range.timeframe);
        let id = range.id;
        self.by_symbol_timeframe.entry(key).or_default().push(id);
        self.by_id.insert(id, range);
    }

    pub fn get(&self, id: Uuid) -> Option<&TradingRange> {
        self.by_id.get(&id)
    }

    /// Ranges for a symbol/timeframe that are still matchable (not
    /// soft-deleted, not Failed).
    pub fn active_for(&self, symbol: &str, timeframe: Timeframe) -> Vec<&TradingRange> {
        self.by_symbol_timeframe
            .get(&(symbol.to_string(), timeframe))
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .filter(|r| r.is_matchable())
            .collect()
    }

    pub fn soft_delete(&mut self, id: Uuid) -> bool {
        match self.by_id.get_mut(&id) {
            Some(range) => {
                range.deleted = true;
                true
            }
            None => false,
        }
    }

    /// Increments the touch count for the support or resistance side of a
    /// range if `price` retests it within `tolerance`.
    pub fn record_touch(&mut self, id: Uuid, price: Decimal, tolerance: Decimal) {
        let Some(range) = self.by_id.get_mut(&id) else {
            return;
        };
        if !range.is_matchable() {
            return;
        }
        if range.support > Decimal::ZERO {
            let support_diff = ((price - range.support) / range.support).abs();
            if support_diff <= tolerance {
                range.touch_count_support += 1;
            }
        }
        if range.resistance > Decimal::ZERO {
            let resistance_diff = ((price - range.resistance) / range.resistance).abs();
            if resistance_diff <= tolerance {
                range.touch_count_resistance += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use wyckoff_core::levels::LevelVote;
    use wyckoff_core::phase::WyckoffPhase;
    use wyckoff_core::range::RangeStatus;

    fn sample_range() -> TradingRange {
        TradingRange {
            id: Uuid::new_v4(),
            symbol: "TEST".into(),
            timeframe: Timeframe::D1,
            start_timestamp: Utc::now(),
            end_timestamp: Utc::now(),
            start_index: 0,
            end_index: 30,
            support: dec!(90),
            resistance: dec!(110),
            touch_count_support: 0,
            touch_count_resistance: 0,
            quality_score: dec!(75),
            status: RangeStatus::Active,
            cause_factor: dec!(2.5),
            phase: WyckoffPhase::B,
            creek: Some(LevelVote { price: dec!(90), strength: dec!(80), provenance: vec![1] }),
            ice: Some(LevelVote { price: dec!(110), strength: dec!(80), provenance: vec![2] }),
            jump: None,
            deleted: false,
        }
    }

    #[test]
    fn soft_deleted_ranges_are_excluded_from_active() {
        let mut index = RangeIndex::new();
        let range = sample_range();
        let id = range.id;
        index.insert(range);
        assert_eq!(index.active_for("TEST", Timeframe::D1).len(), 1);
        index.soft_delete(id);
        assert_eq!(index.active_for("TEST", Timeframe::D1).len(), 0);
        assert!(index.get(id).is_some());
    }

    #[test]
    fn record_touch_increments_nearest_level() {
        let mut index = RangeIndex::new();
        let range = sample_range();
        let id = range.id;
        index.insert(range);
        index.record_touch(id, dec!(90.2), dec!(0.01));
        assert_eq!(index.get(id).unwrap().touch_count_support, 1);
        assert_eq!(index.get(id).unwrap().touch_count_resistance, 0);
    }
}
