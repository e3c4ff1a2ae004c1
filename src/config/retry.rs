use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Backoff applied when an established watch has to be re-listed
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Consecutive failed attempts tolerated (0 means unlimited retries)
    #[serde(default)]
    pub max_retries: usize,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Doubles `current`, capped at `max_delay_ms`
    pub fn next_delay(
        &self,
        current: Duration,
    ) -> Duration {
        current.saturating_mul(2).min(Duration::from_millis(self.max_delay_ms))
    }

    pub fn exhausted(
        &self,
        attempts: usize,
    ) -> bool {
        self.max_retries > 0 && attempts >= self.max_retries
    }
}

fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    30000
}
