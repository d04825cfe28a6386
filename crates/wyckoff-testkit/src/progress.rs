//! Fake `ProgressSink` that records every update and asserts sequence
//! numbers never regress within a run, mirroring the real contract's
//! monotone-per-run guarantee (spec.md §6).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use wyckoff_core::collaborators::ProgressSink;
use wyckoff_core::run::ProgressUpdate;

#[derive(Default)]
pub struct RecordingProgressSink {
    updates: Mutex<HashMap<Uuid, Vec<ProgressUpdate>>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates_for(&self, run_id: Uuid) -> Vec<ProgressUpdate> {
        self.updates.lock().expect("progress sink lock poisoned").get(&run_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgressSink {
    async fn publish(&self, update: ProgressUpdate) {
        let mut updates = self.updates.lock().expect("progress sink lock poisoned");
        let entry = updates.entry(update.run_id).or_default();
        if let Some(last) = entry.last() {
            debug_assert!(update.sequence_number > last.sequence_number, "progress sequence numbers must be monotone per run");
        }
        entry.push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn update(run_id: Uuid, sequence_number: u64) -> ProgressUpdate {
        ProgressUpdate { run_id, bars_analyzed: sequence_number, total_bars: 10, percent_complete: dec!(0), sequence_number, timestamp: Utc::now() }
    }

    #[tokio::test]
    async fn records_updates_per_run() {
        let sink = RecordingProgressSink::new();
        let run_id = Uuid::new_v4();
        sink.publish(update(run_id, 1)).await;
        sink.publish(update(run_id, 2)).await;
        assert_eq!(sink.updates_for(run_id).len(), 2);
    }
}
