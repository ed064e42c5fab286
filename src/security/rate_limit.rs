//! Fixed-window attempt counter keyed by an identifier string.
//!
//! A window opens on the first attempt for a key and lasts `window`; within
//! it, the first `max_attempts` calls are allowed. Bursts of up to twice the
//! limit are possible across a window boundary. Windows are half-open: a
//! window that started at `t` has expired at `t + window`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Attempt state for a single key.
#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    count: u32,
    reset_at: Instant,
}

/// Per-key attempt limiter shared by every form gate.
///
/// Time comes from the tokio clock, so paused-time tests can step through
/// windows deterministically.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, AttemptWindow>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt for `key` and report whether it is allowed.
    pub fn is_allowed(&self, key: &str, max_attempts: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        match windows.get_mut(key) {
            Some(entry) if now < entry.reset_at => {
                entry.count = entry.count.saturating_add(1);
                entry.count <= max_attempts
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    AttemptWindow {
                        count: 1,
                        reset_at: now + window,
                    },
                );
                true
            }
        }
    }

    /// Whole seconds until the window for `key` expires, rounded up.
    ///
    /// Unknown keys and expired windows report 0.
    pub fn remaining_time(&self, key: &str) -> u64 {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        match windows.get(key) {
            Some(entry) => {
                let millis = entry.reset_at.saturating_duration_since(now).as_millis() as u64;
                millis.div_ceil(1000)
            }
            None => 0,
        }
    }

    /// Forget a key entirely.
    pub fn reset(&self, key: &str) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Drop expired windows. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, entry| now < entry.reset_at);
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
