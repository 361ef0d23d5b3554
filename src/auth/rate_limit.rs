//! Login rate limiting
//!
//! Fixed-window counter keyed by caller source address. The key is weak
//! on purpose: shared NATs and proxies collapse distinct callers, which
//! is a documented limitation of address-based throttling. State is
//! process-local and lost on restart; this is advisory throttling, not
//! a distributed limiter.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::AppError;

const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Rate limiter entry
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of attempts in current window
    count: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimitEntry {
    /// Check if this entry is in a new window
    fn is_new_window(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }

    /// Increment count or reset if new window
    fn increment(&mut self, window_duration: Duration) {
        if self.is_new_window(window_duration) {
            // New window - reset
            self.count = 1;
            self.window_start = Instant::now();
        } else {
            // Same window - increment
            self.count += 1;
        }
    }
}

/// Rate limiter for login attempts
pub struct RateLimiter {
    /// Rate limit entries: source address -> entry
    entries: RwLock<HashMap<String, RateLimitEntry>>,
    /// Maximum attempts per window
    max_attempts: u32,
    /// Window duration
    window_duration: Duration,
    /// Maximum number of tracked keys in memory
    max_tracked_keys: usize,
}

impl RateLimiter {
    /// Create new rate limiter
    ///
    /// # Arguments
    /// * `max_attempts` - Maximum attempts per window
    /// * `window_duration` - Window duration
    pub fn new(max_attempts: u32, window_duration: Duration) -> Self {
        Self::with_max_tracked_keys(max_attempts, window_duration, DEFAULT_MAX_TRACKED_KEYS)
    }

    /// Create new rate limiter with explicit in-memory key cap.
    pub fn with_max_tracked_keys(
        max_attempts: u32,
        window_duration: Duration,
        max_tracked_keys: usize,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_attempts: max_attempts.max(1),
            window_duration,
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    fn prune_expired_locked(
        entries: &mut HashMap<String, RateLimitEntry>,
        window_duration: Duration,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, value| !value.is_new_window(window_duration));
        before - entries.len()
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, RateLimitEntry>) -> bool {
        let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, value)| value.window_start)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };
        entries.remove(&oldest_key);
        true
    }

    /// Check if an attempt should be allowed
    ///
    /// # Arguments
    /// * `key` - Caller source address
    ///
    /// # Returns
    /// Ok if allowed, `TooManyAttempts` if the window is exhausted
    pub async fn check_and_increment(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_tracked_keys {
            Self::prune_expired_locked(&mut entries, self.window_duration);
            if entries.len() >= self.max_tracked_keys {
                let _ = Self::evict_oldest_locked(&mut entries);
            }
        }

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: Instant::now(),
            });

        if !entry.is_new_window(self.window_duration) && entry.count >= self.max_attempts {
            // Window exhausted
            Err(AppError::TooManyAttempts)
        } else {
            entry.increment(self.window_duration);
            Ok(())
        }
    }

    /// Get current count for a key
    pub async fn get_count(&self, key: &str) -> u32 {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| !e.is_new_window(self.window_duration))
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Prune old entries
    ///
    /// Should be called periodically to clean up expired entries.
    pub async fn prune_old(&self) {
        let mut entries = self.entries.write().await;
        let removed = Self::prune_expired_locked(&mut entries, self.window_duration);

        if removed > 0 {
            tracing::debug!("Pruned {} old rate limit entries", removed);
        }
    }

    /// Number of tracked keys, expired windows included
    pub async fn tracked_keys(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sixth_attempt_in_window_is_rejected() {
        let limiter = RateLimiter::new(5, Duration::from_secs(900));

        for _ in 0..5 {
            assert!(limiter.check_and_increment("198.51.100.7").await.is_ok());
        }
        assert!(limiter.check_and_increment("198.51.100.7").await.is_err());
        assert_eq!(limiter.get_count("198.51.100.7").await, 5);
    }

    #[tokio::test]
    async fn window_elapse_resets_the_counter() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));

        for _ in 0..3 {
            assert!(limiter.check_and_increment("198.51.100.7").await.is_ok());
        }
        assert!(limiter.check_and_increment("198.51.100.7").await.is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check_and_increment("198.51.100.7").await.is_ok());
        assert_eq!(limiter.get_count("198.51.100.7").await, 1);
    }

    #[tokio::test]
    async fn different_sources_have_separate_windows() {
        let limiter = RateLimiter::new(2, Duration::from_secs(900));

        assert!(limiter.check_and_increment("198.51.100.7").await.is_ok());
        assert!(limiter.check_and_increment("198.51.100.7").await.is_ok());
        assert!(limiter.check_and_increment("203.0.113.9").await.is_ok());
        assert!(limiter.check_and_increment("203.0.113.9").await.is_ok());

        assert!(limiter.check_and_increment("198.51.100.7").await.is_err());
        assert!(limiter.check_and_increment("203.0.113.9").await.is_err());
    }

    #[tokio::test]
    async fn max_tracked_keys_evicts_oldest_entry() {
        let limiter = RateLimiter::with_max_tracked_keys(10, Duration::from_secs(60), 2);

        assert!(limiter.check_and_increment("198.51.100.1").await.is_ok());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(limiter.check_and_increment("198.51.100.2").await.is_ok());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(limiter.check_and_increment("198.51.100.3").await.is_ok());

        assert_eq!(limiter.tracked_keys().await, 2);
        assert_eq!(limiter.get_count("198.51.100.1").await, 0);
        assert_eq!(limiter.get_count("198.51.100.2").await, 1);
        assert_eq!(limiter.get_count("198.51.100.3").await, 1);
    }
}
