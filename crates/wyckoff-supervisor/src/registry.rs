//! In-memory run registry (spec.md §4.F). One registry per `RunKind`, so
//! admission caps and eviction never interact across kinds. Cleanup runs
//! before every insert rather than on a background timer.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wyckoff_core::run::{BacktestRun, RunStatus};

pub struct RunRegistry {
    max_entries: usize,
    ttl: Duration,
    runs: Mutex<HashMap<Uuid, BacktestRun>>,
    tokens: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl RunRegistry {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self { max_entries, ttl, runs: Mutex::new(HashMap::new()), tokens: Mutex::new(HashMap::new()) }
    }

    /// 1. drops terminal entries older than the TTL; 2. if still at or
    /// over capacity, drops the oldest non-running entries until under
    /// capacity. RUNNING entries are never evicted by either step. The
    /// corresponding cancellation tokens are dropped alongside.
    fn cleanup_stale_entries(&self, runs: &mut HashMap<Uuid, BacktestRun>, tokens: &mut HashMap<Uuid, CancellationToken>, now: DateTime<Utc>) {
        let ttl_secs = self.ttl.as_secs() as i64;
        runs.retain(|_, run| !(run.status.is_terminal() && (now - run.created_at).num_seconds() > ttl_secs));

        if runs.len() >= self.max_entries {
            let mut evictable: Vec<(Uuid, DateTime<Utc>)> =
                runs.iter().filter(|(_, run)| run.status != RunStatus::Running).map(|(id, run)| (*id, run.created_at)).collect();
            evictable.sort_by_key(|(_, created_at)| *created_at);
            let overflow = runs.len() + 1 - self.max_entries;
            for (id, _) in evictable.into_iter().take(overflow) {
                runs.remove(&id);
            }
        }

        tokens.retain(|id, _| runs.contains_key(id));
    }

    /// Inserts `run` and mints a fresh cancellation token for it, returned
    /// so the spawned background task can observe it at its suspension
    /// points (spec.md §5).
    pub fn insert(&self, run: BacktestRun, now: DateTime<Utc>) -> CancellationToken {
        let mut runs = self.runs.lock().expect("run registry lock poisoned");
        let mut tokens = self.tokens.lock().expect("run registry lock poisoned");
        self.cleanup_stale_entries(&mut runs, &mut tokens, now);
        let token = CancellationToken::new();
        tokens.insert(run.run_id, token.clone());
        runs.insert(run.run_id, run);
        token
    }

    pub fn get(&self, run_id: Uuid) -> Option<BacktestRun> {
        self.runs.lock().expect("run registry lock poisoned").get(&run_id).cloned()
    }

    /// Signals cancellation for `run_id`'s background task. The task alone
    /// is responsible for observing the token and moving its own record to
    /// CANCELLED — this only flips the token.
    pub fn cancel(&self, run_id: Uuid) -> bool {
        match self.tokens.lock().expect("run registry lock poisoned").get(&run_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn update(&self, run_id: Uuid, f: impl FnOnce(&mut BacktestRun)) {
        let mut runs = self.runs.lock().expect("run registry lock poisoned");
        if let Some(run) = runs.get_mut(&run_id) {
            f(run);
        }
    }

    pub fn count_running(&self) -> usize {
        self.runs.lock().expect("run registry lock poisoned").values().filter(|r| r.status == RunStatus::Running).count()
    }

    pub fn list(&self, limit: usize, offset: usize) -> Vec<BacktestRun> {
        let runs = self.runs.lock().expect("run registry lock poisoned");
        let mut all: Vec<BacktestRun> = runs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.into_iter().skip(offset).take(limit).collect()
    }
}
