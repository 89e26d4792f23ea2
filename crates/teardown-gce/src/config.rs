//! GCE teardown configuration

use backon::ExponentialBuilder;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use teardown_core::ConfigError;
use teardown_core::SchedulerConfig;
use teardown_core::wait::WaitConfig;

/// Default time allowed for a single compute operation to finish, in seconds
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;

/// Default first delay between operation polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default cap on the delay between operation polls, in seconds
pub const DEFAULT_MAX_POLL_INTERVAL_SECS: u64 = 10;

/// Default number of retries of a throttled delete call
pub const DEFAULT_THROTTLE_RETRIES: usize = 5;

fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_poll_interval_secs() -> u64 {
    DEFAULT_MAX_POLL_INTERVAL_SECS
}

fn default_throttle_retries() -> usize {
    DEFAULT_THROTTLE_RETRIES
}

/// Which cluster to tear down and how patiently to talk to the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GceTeardownConfig {
    /// Cluster name, e.g. `my.cluster.example.com`
    #[garde(length(min = 1))]
    pub cluster_name: String,

    /// Region to scan; defaults to the client's region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub region: Option<String>,

    #[serde(default = "default_operation_timeout_secs")]
    #[garde(range(min = 1))]
    pub operation_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 1))]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_interval_secs")]
    #[garde(range(min = 1))]
    pub max_poll_interval_secs: u64,

    #[serde(default = "default_throttle_retries")]
    #[garde(skip)]
    pub throttle_retries: usize,

    #[serde(default)]
    #[garde(dive)]
    pub scheduler: SchedulerConfig,
}

impl GceTeardownConfig {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            region: None,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_secs: DEFAULT_MAX_POLL_INTERVAL_SECS,
            throttle_retries: DEFAULT_THROTTLE_RETRIES,
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Polling schedule for long-running operations
    pub fn operation_wait(&self) -> WaitConfig {
        let initial_delay = Duration::from_millis(self.poll_interval_ms);
        WaitConfig {
            initial_delay,
            max_delay: Duration::from_secs(self.max_poll_interval_secs).max(initial_delay),
            timeout: Duration::from_secs(self.operation_timeout_secs),
        }
    }

    /// Backoff for delete calls rejected by rate limiting
    pub fn throttle_backoff(&self) -> ExponentialBuilder {
        let wait = self.operation_wait();
        ExponentialBuilder::default()
            .with_min_delay(wait.initial_delay)
            .with_max_delay(wait.max_delay)
            .with_jitter()
            .with_max_times(self.throttle_retries)
    }
}
