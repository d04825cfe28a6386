//! Per-detector circuit breaker (spec.md §6, §9 Design Notes). A simple
//! sliding failure-window counter guarded by one lock; half-open recovery
//! is driven by the age of the oldest recorded failure, not a timer task.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct BreakerState {
    failures: Vec<Instant>,
}

/// Opens a named detector after `failure_threshold` consecutive failures
/// observed within `window`. While open the detector is bypassed by the
/// caller (the orchestrator records a `StageResult` warning instead of
/// invoking it). `window` after the oldest recorded failure, the breaker
/// transitions to half-open: the next call is allowed through, and success
/// clears the window entirely.
pub struct CircuitBreaker {
    failure_threshold: usize,
    window: Duration,
    state: Mutex<HashMap<String, BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, window: Duration) -> Self {
        Self {
            failure_threshold,
            window,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_failure(&self, name: &str, now: Instant) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        let entry = state.entry(name.to_string()).or_default();
        entry.failures.push(now);
    }

    /// A success at any point (including while half-open) clears the
    /// failure window, fully closing the breaker.
    pub fn record_success(&self, name: &str) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        if let Some(entry) = state.get_mut(name) {
            entry.failures.clear();
        }
    }

    /// True if the named detector is currently open (should be bypassed).
    pub fn is_open(&self, name: &str, now: Instant) -> bool {
        let state = self.state.lock().expect("circuit breaker lock poisoned");
        let Some(entry) = state.get(name) else {
            return false;
        };
        if entry.failures.len() < self.failure_threshold {
            return false;
        }
        let oldest = entry.failures[0];
        now.duration_since(oldest) < self.window
    }
}
