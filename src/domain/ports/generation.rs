//! Generation service port.
//!
//! The external completion API is an opaque collaborator: instructions plus
//! input go in, a structured value comes back. Output is non-deterministic
//! for identical input, and retried calls are at-least-once; callers must
//! tolerate duplicate upstream effects.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::error::Retryable;

/// Shape the raw response must parse into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free text; returned as a JSON string value.
    Text,
    /// A JSON object carrying at least the listed keys.
    JsonObject {
        /// Schema name included in the prompt for the model's benefit.
        schema_name: &'static str,
        required_keys: &'static [&'static str],
    },
    /// A JSON array of objects, each carrying the listed keys.
    JsonArray {
        schema_name: &'static str,
        required_keys: &'static [&'static str],
    },
}

/// One structured completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System-level instructions (role, constraints).
    pub instructions: String,
    /// The user-level input body.
    pub input: String,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn new(
        instructions: impl Into<String>,
        input: impl Into<String>,
        format: ResponseFormat,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
            format,
        }
    }
}

/// Typed failure at the generation service boundary.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("response did not match expected shape '{schema}': {reason}")]
    Malformed { schema: String, reason: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),
}

impl Retryable for GenerationError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::Unavailable(_) | Self::Network(_)
        )
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limit",
            Self::Unavailable(_) => "unavailable",
            Self::Malformed { .. } => "malformed",
            Self::Auth(_) => "auth",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Network(_) => "network",
        }
    }
}

/// Port for the external completion API.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Issue a completion and validate the response against the requested
    /// shape. Implementations attempt at most one repair re-prompt before
    /// surfacing `GenerationError::Malformed`.
    async fn complete(&self, request: CompletionRequest) -> Result<Value, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Timeout.is_transient());
        assert!(GenerationError::RateLimited.is_transient());
        assert!(GenerationError::Unavailable("503".into()).is_transient());
        assert!(!GenerationError::Auth("bad key".into()).is_transient());
        assert!(!GenerationError::Malformed {
            schema: "draft".into(),
            reason: "not json".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_kinds_stable() {
        assert_eq!(GenerationError::Timeout.error_kind(), "timeout");
        assert_eq!(GenerationError::RateLimited.error_kind(), "rate_limit");
    }
}
