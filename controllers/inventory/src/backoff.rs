//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciles, tracked per resource. Delays are
//! computed in minutes and follow 1m, 1m, 2m, 3m, 5m, 8m, 10m (max). A
//! successful reconcile resets the resource's sequence. Entries idle for
//! longer than [`IDLE_HORIZON`] are dropped, which covers resources deleted
//! while failing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// A failing resource is retried at least every 10 minutes, so an entry
/// untouched for this long no longer belongs to a live failure.
pub const IDLE_HORIZON: Duration = Duration::from_secs(30 * 60);

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with minimum and maximum values in minutes
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Returns the current delay and advances the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_minutes * 60);

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Per-resource backoff state
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
    last_failure: Instant,
}

impl BackoffState {
    fn new(now: Instant) -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10), // 1 minute min, 10 minutes max
            error_count: 0,
            last_failure: now,
        }
    }
}

/// Consecutive-failure tracking keyed by `Kind/namespace/name`
#[derive(Debug, Clone, Default)]
pub struct BackoffTracker {
    states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl BackoffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and returns (delay before retry, consecutive failures).
    pub fn record_failure(&self, key: &str) -> (Duration, u32) {
        self.record_failure_at(key, Instant::now())
    }

    fn record_failure_at(&self, key: &str, now: Instant) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                states.retain(|_, s| now.saturating_duration_since(s.last_failure) < IDLE_HORIZON);
                let state = states
                    .entry(key.to_string())
                    .or_insert_with(|| BackoffState::new(now));
                state.error_count += 1;
                state.last_failure = now;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(60), 1)
            }
        }
    }

    /// Forgets the failure history of `key` (on successful reconciliation).
    pub fn reset(&self, key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(key);
        }
    }

    pub fn error_count(&self, key: &str) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}
