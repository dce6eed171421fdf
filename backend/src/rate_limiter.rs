use std::collections::HashMap;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};
use tracing::{error, warn};

use crate::error::ApiError;

#[derive(Debug)]
struct Window {
    attempts: u32,
    started: OffsetDateTime,
}

/// Fixed-window limiter keyed by an arbitrary string, usually an action name
/// plus the caller's fingerprint.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        self.check_at(key, OffsetDateTime::now_utc())
    }

    pub fn check_at(&self, key: &str, now: OffsetDateTime) -> Result<(), ApiError> {
        let mut windows = self.windows.lock().map_err(|e| {
            error!("Failed to acquire rate limit lock: {}", e);
            ApiError::Internal("rate limiter poisoned".into())
        })?;

        windows.retain(|_, w| now - w.started <= self.window * 2);

        let window = windows.entry(key.to_string()).or_insert(Window { attempts: 0, started: now });
        if now - window.started > self.window {
            *window = Window { attempts: 0, started: now };
        }
        if window.attempts >= self.max_attempts {
            let wait = (window.started + self.window - now).whole_seconds().max(1);
            warn!(key, wait, "rate limit triggered");
            return Err(ApiError::RateLimited(format!(
                "Rate limit exceeded. Please try again in {} seconds.",
                wait
            )));
        }
        window.attempts += 1;
        Ok(())
    }

    /// Attempts left for `key` in its current window.
    pub fn remaining_at(&self, key: &str, now: OffsetDateTime) -> u32 {
        let Ok(windows) = self.windows.lock() else {
            return 0;
        };
        match windows.get(key) {
            Some(w) if now - w.started <= self.window => self.max_attempts.saturating_sub(w.attempts),
            _ => self.max_attempts,
        }
    }
}
