//! GCE error classification
//!
//! API failures are classified by HTTP status and the `reason` of the first
//! error detail. Failed operations carry their own error codes, which are
//! classified the same way.

use teardown_core::DeleteError;
use thiserror::Error;

/// GCE error categories for retry and teardown logic
#[derive(Debug, Clone, Error)]
pub enum GceError {
    /// Resource was not found (already deleted)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Rate limit or quota exceeded (retryable with backoff)
    #[error("rate limit exceeded: {0}")]
    Throttled(String),

    /// Resource is still referenced by another resource (retryable)
    #[error("resource in use: {0}")]
    ResourceInUse(String),

    /// Malformed compute self link
    #[error("invalid resource URL: {0}")]
    InvalidUrl(String),

    /// Payload does not match the resource type
    #[error("unexpected payload for {0}")]
    UnexpectedPayload(String),

    /// Generic API error with status and reason
    #[error("GCE API error ({status}): {message}")]
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },
}

impl GceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GceError::NotFound(_))
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, GceError::Throttled(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GceError::Throttled(_) | GceError::ResourceInUse(_))
    }
}

/// API `reason` values meaning "not found"
const NOT_FOUND_REASONS: &[&str] = &["notFound"];

/// API `reason` values for throttling and quota
const THROTTLING_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "backendError",
];

/// API `reason` values for resources still in use
const IN_USE_REASONS: &[&str] = &["resourceInUseByAnotherResource", "resourceNotReady"];

/// Operation error codes meaning "not found"
const OPERATION_NOT_FOUND_CODES: &[&str] = &["RESOURCE_NOT_FOUND"];

/// Operation error codes for resources still in use
const OPERATION_IN_USE_CODES: &[&str] = &[
    "RESOURCE_IN_USE_BY_ANOTHER_RESOURCE",
    "RESOURCE_NOT_READY",
];

/// Operation error codes for throttling and quota
const OPERATION_THROTTLING_CODES: &[&str] = &["QUOTA_EXCEEDED", "RATE_LIMIT_EXCEEDED"];

/// Classify an API error response
pub fn classify_api_error(status: u16, reason: Option<&str>, message: &str) -> GceError {
    let message = message.to_string();
    match (status, reason) {
        (_, Some(r)) if NOT_FOUND_REASONS.contains(&r) => GceError::NotFound(message),
        (404, _) => GceError::NotFound(message),
        (_, Some(r)) if THROTTLING_REASONS.contains(&r) => GceError::Throttled(message),
        (429, _) => GceError::Throttled(message),
        (_, Some(r)) if IN_USE_REASONS.contains(&r) => GceError::ResourceInUse(message),
        _ => GceError::Api {
            status,
            reason: reason.map(str::to_string),
            message,
        },
    }
}

/// Classify the error code of a failed long-running operation
pub fn classify_operation_error(code: &str, message: &str) -> GceError {
    let message = message.to_string();
    match code {
        c if OPERATION_NOT_FOUND_CODES.contains(&c) => GceError::NotFound(message),
        c if OPERATION_IN_USE_CODES.contains(&c) => GceError::ResourceInUse(message),
        c if OPERATION_THROTTLING_CODES.contains(&c) => GceError::Throttled(message),
        c => GceError::Api {
            status: 0,
            reason: Some(c.to_string()),
            message,
        },
    }
}

impl From<GceError> for DeleteError {
    fn from(e: GceError) -> Self {
        match e {
            GceError::NotFound(m) => DeleteError::NotFound(m),
            GceError::Throttled(_) => DeleteError::Throttled,
            GceError::ResourceInUse(m) => DeleteError::DependencyViolation(m),
            GceError::Api {
                reason, message, ..
            } => DeleteError::Provider {
                code: reason,
                message,
            },
            other => DeleteError::provider(other.to_string()),
        }
    }
}
