use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::Error;
use crate::ResourceId;
use crate::Result;

/// Construction parameters for a [`Controller`](crate::Controller)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Coordinates of the watched resource collection
    #[serde(default)]
    pub resource: ResourceId,

    /// Period of full re-delivery from the local snapshot (milliseconds).
    /// Zero disables resynchronization.
    #[serde(default)]
    pub resync_interval_ms: u64,

    /// Upper bound of objects handed to a single handler call
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Number of concurrent dispatcher loops; values below 1 run one worker
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pause before a worker loop re-enters after returning (milliseconds)
    #[serde(default = "default_worker_idle_period_ms")]
    pub worker_idle_period_ms: u64,

    /// Upper bound on the initial cache sync (milliseconds).
    /// Zero waits until the shutdown signal fires.
    #[serde(default)]
    pub sync_timeout_ms: u64,

    /// Re-list backoff once the watch stream of a synced informer closes
    #[serde(default)]
    pub watch_retry: BackoffPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resource: ResourceId::default(),
            resync_interval_ms: 0,
            max_batch: default_max_batch(),
            workers: default_workers(),
            worker_idle_period_ms: default_worker_idle_period_ms(),
            sync_timeout_ms: 0,
            watch_retry: BackoffPolicy::default(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_batch must be greater than 0".into(),
            )));
        }

        if self.resource.resource.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "resource.resource must not be empty".into(),
            )));
        }

        if self.resource.version.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "resource.version must not be empty".into(),
            )));
        }

        if self.watch_retry.base_delay_ms == 0 || self.watch_retry.max_delay_ms < self.watch_retry.base_delay_ms {
            return Err(Error::Config(ConfigError::Message(
                "watch_retry requires 0 < base_delay_ms <= max_delay_ms".into(),
            )));
        }

        Ok(())
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }

    pub fn worker_idle_period(&self) -> Duration {
        Duration::from_millis(self.worker_idle_period_ms)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        (self.sync_timeout_ms > 0).then(|| Duration::from_millis(self.sync_timeout_ms))
    }
}

fn default_max_batch() -> usize {
    1
}
fn default_workers() -> usize {
    1
}
// in ms
fn default_worker_idle_period_ms() -> u64 {
    1000
}
