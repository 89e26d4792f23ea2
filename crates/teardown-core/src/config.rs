//! Scheduler configuration loading from JSON

use crate::defaults::{
    default_concurrency, default_max_retry_delay_secs, default_retry_delay_secs,
    default_stall_retries,
};
use crate::error::ConfigError;
use backon::ExponentialBuilder;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables for [`crate::scheduler::DeletionScheduler`].
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, garde::Validate)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Maximum number of deletion groups attempted concurrently within a pass
    #[serde(default = "default_concurrency")]
    #[garde(range(min = 1))]
    pub concurrency: usize,

    /// Extra zero-progress rounds tolerated before the run is declared stalled.
    /// Zero stalls on the first pass that deletes nothing.
    #[serde(default = "default_stall_retries")]
    #[garde(skip)]
    pub stall_retries: u32,

    /// Initial delay between zero-progress rounds
    #[serde(default = "default_retry_delay_secs")]
    #[garde(range(min = 1))]
    pub retry_delay_secs: u64,

    /// Cap on the delay between zero-progress rounds
    #[serde(default = "default_max_retry_delay_secs")]
    #[garde(range(min = 1))]
    pub max_retry_delay_secs: u64,

    /// Overall deadline for the run; unset means no deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 1))]
    pub timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            stall_retries: default_stall_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
            timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Backoff between zero-progress rounds, yielding at most `stall_retries` delays
    pub fn stall_backoff(&self) -> ExponentialBuilder {
        let min = Duration::from_secs(self.retry_delay_secs);
        let max = Duration::from_secs(self.max_retry_delay_secs).max(min);
        ExponentialBuilder::default()
            .with_min_delay(min)
            .with_max_delay(max)
            .with_factor(2.0)
            .with_jitter()
            .with_max_times(self.stall_retries as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "concurrency": 4,
                "stall_retries": 3,
                "timeout_secs": 1800
            }}"#
        )
        .unwrap();

        let config = SchedulerConfig::load(file.path()).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.stall_retries, 3);
        assert_eq!(config.retry_delay_secs, 10);
        assert_eq!(config.timeout(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SchedulerConfig::from_json("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = SchedulerConfig::from_json(r#"{"concurrency": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SchedulerConfig::from_json(r#"{"parallelism": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SchedulerConfig::load(Path::new("/nonexistent/teardown.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_stall_backoff_is_bounded_by_retries() {
        let config = SchedulerConfig {
            stall_retries: 2,
            ..Default::default()
        };
        assert_eq!(config.stall_backoff().build().count(), 2);

        let none = SchedulerConfig::default();
        assert_eq!(none.stall_backoff().build().count(), 0);
    }
}
