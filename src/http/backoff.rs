//! Retry policy and sleep abstraction
//!
//! The executor asks the policy how long to wait and a `Sleeper` to do the
//! waiting, so tests can swap in a clock that only records delays.

use crate::types::BackoffType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How many times to try a request and how long to wait in between
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(alias = "max_retries")]
    pub max_attempts: u32,
    /// Shape of the delay curve
    pub backoff: BackoffType,
    /// Base delay in seconds
    pub backoff_base_seconds: f64,
    /// Upper bound for a single delay in seconds
    pub max_backoff_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::batch()
    }
}

impl RetryPolicy {
    /// Policy for nested, per-item pagination: `2s * 2^attempt`, 5 attempts
    pub fn batch() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffType::Exponential,
            backoff_base_seconds: 2.0,
            max_backoff_seconds: 60.0,
        }
    }

    /// Policy for the top-level search: fixed 5s, 3 attempts
    pub fn top_level() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffType::Constant,
            backoff_base_seconds: 5.0,
            max_backoff_seconds: 60.0,
        }
    }

    /// Policy that never waits, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffType::Constant,
            backoff_base_seconds: 0.0,
            max_backoff_seconds: 0.0,
        }
    }

    /// Delay to wait after the failed attempt with 0-based index `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_seconds;
        let seconds = match self.backoff {
            BackoffType::Constant => base,
            BackoffType::Linear => base * f64::from(attempt + 1),
            BackoffType::Exponential => base * 2f64.powi(attempt.min(30) as i32),
        };
        let seconds = seconds.min(self.max_backoff_seconds);
        if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        }
    }

    /// Attempts actually made; a policy of 0 still sends once
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `delay`
    async fn sleep(&self, delay: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Sleeper that returns immediately and remembers every requested delay
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
    }
}
