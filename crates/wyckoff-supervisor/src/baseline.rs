//! Baseline store (spec.md §4.F): at most one `is_current = true` row at
//! any time. The swap from old to new current happens under one lock.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use wyckoff_core::run::RegressionBaseline;

#[derive(Default)]
pub struct BaselineStore {
    baselines: Mutex<HashMap<Uuid, RegressionBaseline>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears `is_current` on every existing row, then inserts `baseline`
    /// as the new current row, all under one lock acquisition.
    pub fn establish(&self, mut baseline: RegressionBaseline) -> Uuid {
        let mut baselines = self.baselines.lock().expect("baseline store lock poisoned");
        for existing in baselines.values_mut() {
            existing.is_current = false;
        }
        baseline.is_current = true;
        let id = baseline.baseline_id;
        baselines.insert(id, baseline);
        id
    }

    pub fn current(&self) -> Option<RegressionBaseline> {
        self.baselines.lock().expect("baseline store lock poisoned").values().find(|b| b.is_current).cloned()
    }

    pub fn history(&self) -> Vec<RegressionBaseline> {
        let baselines = self.baselines.lock().expect("baseline store lock poisoned");
        let mut all: Vec<RegressionBaseline> = baselines.values().cloned().collect();
        all.sort_by(|a, b| b.established_at.cmp(&a.established_at));
        all
    }
}
