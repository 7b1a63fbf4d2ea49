//! Publishing service port.
//!
//! An authenticated POST of an assembled post to the publishing platform,
//! treated as an opaque collaborator.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::Retryable;
use crate::domain::models::AssembledPost;

/// What a successful publish returns.
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub published_url: Option<String>,
}

/// Typed failure at the publishing boundary.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("publish request timed out")]
    Timeout,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("publishing service unavailable: {0}")]
    Unavailable(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("post rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),
}

impl Retryable for PublishError {
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
            Self::Auth(_) => "auth",
            Self::Rejected(_) => "rejected",
            Self::Network(_) => "network",
        }
    }
}

/// Port for the publishing platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, post: &AssembledPost) -> Result<PublishReceipt, PublishError>;
}
