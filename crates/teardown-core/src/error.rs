//! Error types for discovery, deletion and scheduling
//!
//! Deletion errors are classified so the scheduler can tell a resource that is
//! already gone (success) from one that is still held by a dependent
//! (retryable) and from a hard provider failure.

use crate::resource::ResourceKey;
use thiserror::Error;

/// Failure of a single deletion attempt
#[derive(Debug, Clone, Error)]
pub enum DeleteError {
    /// Resource was not found (treated as already deleted)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Resource still has dependent objects (retryable)
    #[error("resource still has dependencies: {0}")]
    DependencyViolation(String),

    /// Provider rate limit exceeded (retryable)
    #[error("rate limit exceeded")]
    Throttled,

    /// Neither a deleter nor a group deleter was attached to the resource
    #[error("no deleter registered for {key}")]
    NoDeleter { key: ResourceKey },

    /// Waiting for an asynchronous provider operation timed out
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// Generic provider error with optional code
    #[error("{message}")]
    Provider {
        code: Option<String>,
        message: String,
    },
}

impl DeleteError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DeleteError::NotFound(_))
    }

    pub fn is_dependency_violation(&self) -> bool {
        matches!(self, DeleteError::DependencyViolation(_))
    }

    /// Check if this error is expected to clear up on its own
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeleteError::DependencyViolation(_) | DeleteError::Throttled | DeleteError::Timeout(_)
        )
    }
}

/// Failure while enumerating a cluster's resources.
///
/// Discovery errors are fatal: an incomplete graph must never be scheduled.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A provider listing call failed
    #[error("error listing {what}")]
    Listing {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The discovery scope (regions, zones, projects) could not be determined
    #[error("{0}")]
    Scope(String),
}

impl DiscoveryError {
    pub fn listing(
        what: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Listing {
            what: what.into(),
            source: source.into(),
        }
    }
}

/// Failure to produce a dump record for a resource
#[derive(Debug, Error)]
#[error("failed to dump {key}: {message}")]
pub struct DumpError {
    pub key: ResourceKey,
    pub message: String,
}

impl DumpError {
    pub fn new(key: ResourceKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Terminal teardown failure, as seen by the caller
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// No pass made progress and resources remain
    #[error("not making progress deleting resources; {remaining} resource(s) remain")]
    Stalled {
        remaining: usize,
        /// A blocking cycle found among the remaining resources, if any
        cycle: Option<Vec<ResourceKey>>,
    },

    /// The run was cancelled or hit its deadline
    #[error("teardown cancelled with {remaining} resource(s) remaining")]
    Cancelled { remaining: usize },
}

impl TeardownError {
    /// A stall without a blocking cycle may succeed on a later run
    pub fn is_retryable(&self) -> bool {
        match self {
            TeardownError::Discovery(_) => false,
            TeardownError::Stalled { cycle, .. } => cycle.is_none(),
            TeardownError::Cancelled { .. } => true,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] garde::Report),
}

impl ConfigError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_error_classification() {
        assert!(DeleteError::NotFound("disk".into()).is_not_found());
        assert!(!DeleteError::Throttled.is_not_found());

        assert!(DeleteError::DependencyViolation("in use".into()).is_retryable());
        assert!(DeleteError::Throttled.is_retryable());
        assert!(DeleteError::Timeout("op-1".into()).is_retryable());
        assert!(!DeleteError::provider("boom").is_retryable());
        assert!(
            !DeleteError::NoDeleter {
                key: ResourceKey::new("Disk", "d1")
            }
            .is_retryable()
        );
    }

    #[test]
    fn delete_error_display() {
        assert_eq!(
            DeleteError::NoDeleter {
                key: ResourceKey::new("Route", "r1")
            }
            .to_string(),
            "no deleter registered for Route:r1"
        );
        assert_eq!(DeleteError::provider("quota").to_string(), "quota");
    }

    #[test]
    fn discovery_error_keeps_source() {
        let io = std::io::Error::other("connection reset");
        let err = DiscoveryError::listing("disks", io);
        assert_eq!(err.to_string(), "error listing disks");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "connection reset");
    }

    #[test]
    fn teardown_error_retryability() {
        let stalled = TeardownError::Stalled {
            remaining: 2,
            cycle: None,
        };
        assert!(stalled.is_retryable());

        let cyclic = TeardownError::Stalled {
            remaining: 2,
            cycle: Some(vec![ResourceKey::new("A", "a"), ResourceKey::new("B", "b")]),
        };
        assert!(!cyclic.is_retryable());

        let discovery = TeardownError::from(DiscoveryError::Scope("no zones".into()));
        assert!(!discovery.is_retryable());
        assert!(TeardownError::Cancelled { remaining: 1 }.is_retryable());
    }

    #[test]
    fn config_io_error_mentions_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/etc/teardown.json", io_err);
        assert!(err.to_string().contains("/etc/teardown.json"));
    }
}
