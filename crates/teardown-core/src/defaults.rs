//! Default scheduler settings
//!
//! Shared by [`crate::config::SchedulerConfig`] and provider adapters so that a
//! config file with missing fields behaves like `SchedulerConfig::default()`.

/// Default number of deletion groups attempted at once within a pass
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of extra zero-progress rounds before declaring a stall
pub const DEFAULT_STALL_RETRIES: u32 = 0;

/// Default initial delay between zero-progress rounds, in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Default cap on the delay between zero-progress rounds, in seconds
pub const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 60;

// Serde default functions for struct field defaults

pub fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

pub fn default_stall_retries() -> u32 {
    DEFAULT_STALL_RETRIES
}

pub fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

pub fn default_max_retry_delay_secs() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_SECS
}
