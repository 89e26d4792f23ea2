//! Waiting with exponential backoff and cancellation support.
//!
//! Used by the scheduler between zero-progress rounds and by provider adapters
//! to poll long-running operations (for example a GCE delete operation) until
//! they finish.

use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for polling with exponential backoff.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError<E> {
    #[error("wait for {0} cancelled")]
    Cancelled(String),

    #[error("timeout waiting for {name} after {timeout:?} ({attempts} attempts)")]
    Timeout {
        name: String,
        timeout: Duration,
        attempts: u32,
    },

    #[error("{0}")]
    Check(E),
}

/// Sleep for `delay`, returning early with `false` if `cancel` fires first.
pub async fn sleep_or_cancelled(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = token.cancelled() => false,
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

/// Poll `check` until it reports ready.
///
/// `check` returns `Ok(true)` when done and `Ok(false)` to poll again; an error
/// ends the wait immediately.
pub async fn wait_for<F, Fut, E>(
    config: &WaitConfig,
    cancel: Option<&CancellationToken>,
    check: F,
    name: &str,
) -> Result<(), WaitError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    loop {
        attempts += 1;

        if cancel.is_some_and(|t| t.is_cancelled()) {
            return Err(WaitError::Cancelled(name.to_string()));
        }

        if start.elapsed() >= config.timeout {
            return Err(WaitError::Timeout {
                name: name.to_string(),
                timeout: config.timeout,
                attempts,
            });
        }

        match check().await {
            Ok(true) => {
                debug!(resource = %name, attempts, "Wait complete");
                return Ok(());
            }
            Ok(false) => {
                let delay = delays.next().unwrap_or(config.max_delay);
                debug!(
                    resource = %name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Not ready, retrying"
                );
                if !sleep_or_cancelled(delay, cancel).await {
                    return Err(WaitError::Cancelled(name.to_string()));
                }
            }
            Err(e) => {
                warn!(resource = %name, error = %e, "Wait check failed");
                return Err(WaitError::Check(e));
            }
        }
    }
}
