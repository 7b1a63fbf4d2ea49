//! Stage abstraction.
//!
//! A stage reads its declared payload keys, does its work (usually one or
//! more generation calls wrapped in the retry executor), and writes new keys
//! back. Retries for external calls happen inside the stage; a `StageError`
//! means the stage's own budget is already spent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::error::{ContextError, ErrorClass, Retryable};
use crate::domain::ports::{GenerationError, PublishError};
use crate::domain::models::{Context, StageResult};
use crate::services::retry::RetryError;

/// Failure of a single stage execution.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ContextError),

    #[error("generation failed after {attempts} attempt(s): {source}")]
    Generation {
        attempts: usize,
        #[source]
        source: GenerationError,
    },

    #[error("publish failed after {attempts} attempt(s): {source}")]
    Publish {
        attempts: usize,
        #[source]
        source: PublishError,
    },
}

impl StageError {
    /// Recovery class of the underlying failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_) => ErrorClass::Validation,
            Self::Generation { source, .. } => classify(source),
            Self::Publish { source, .. } => classify(source),
        }
    }

    /// Short machine-readable kind for error records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Generation { source, .. } => source.error_kind(),
            Self::Publish { source, .. } => source.error_kind(),
        }
    }
}

fn classify<E: Retryable>(source: &E) -> ErrorClass {
    if source.is_transient() {
        ErrorClass::Transient
    } else if source.error_kind() == "auth" {
        ErrorClass::Critical
    } else {
        ErrorClass::Validation
    }
}

impl From<RetryError<GenerationError>> for StageError {
    fn from(err: RetryError<GenerationError>) -> Self {
        let attempts = err.attempts().len().max(1);
        Self::Generation {
            attempts,
            source: err.into_source(),
        }
    }
}

impl From<RetryError<PublishError>> for StageError {
    fn from(err: RetryError<PublishError>) -> Self {
        let attempts = err.attempts().len().max(1);
        Self::Publish {
            attempts,
            source: err.into_source(),
        }
    }
}

/// One unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name; also the owner recorded for every key it writes.
    fn name(&self) -> &'static str;

    /// Payload keys that must exist before this stage runs.
    fn required_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check the context carries everything this stage needs.
    fn validate_input(&self, context: &Context) -> Result<(), StageError> {
        for key in self.required_keys() {
            context.require(key)?;
        }
        Ok(())
    }

    /// Run the stage. Writes go through `Context::insert` under this stage's
    /// name; the returned result lists the keys written.
    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError>;
}

/// Assemble the result record for a completed stage execution.
pub fn stage_result(
    stage_name: &str,
    started_at: DateTime<Utc>,
    context_delta: Vec<String>,
) -> StageResult {
    StageResult {
        stage_name: stage_name.to_string(),
        started_at,
        finished_at: Utc::now(),
        success: true,
        context_delta,
        local_gate: None,
    }
}
