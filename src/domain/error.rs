//! Domain-level errors and the run-failure taxonomy.

use thiserror::Error;

/// Failure classes with distinct recovery policies.
///
/// Transient failures are retried by the retry executor; quality failures go
/// through the bounded feedback loop and quarantine; validation and critical
/// failures propagate to the caller immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Quality,
    Validation,
    Critical,
}

/// Classification hook the retry executor uses to decide whether to retry.
pub trait Retryable {
    /// True when another attempt could plausibly succeed.
    fn is_transient(&self) -> bool;

    /// Short machine-readable kind, recorded on each retry attempt.
    fn error_kind(&self) -> &'static str;
}

/// Errors raised by context payload operations.
#[derive(Error, Debug, Clone)]
pub enum ContextError {
    #[error("required payload key '{0}' is missing")]
    MissingKey(String),

    #[error("payload key '{key}' owned by stage '{owner}' cannot be overwritten by '{writer}'")]
    ForeignKeyOverwrite {
        key: String,
        owner: String,
        writer: String,
    },

    #[error("payload key '{key}' is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

/// Top-level pipeline failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("quality gate '{gate}' still failing after {iterations} feedback iterations")]
    GateExhausted { gate: String, iterations: u32 },

    #[error("pipeline exceeded run deadline of {deadline_secs}s")]
    Timeout { deadline_secs: u64 },

    #[error("stage '{stage}' rejected its input: {source}")]
    InvalidStageInput {
        stage: String,
        #[source]
        source: ContextError,
    },

    #[error("unknown stage '{0}' referenced by gate definition")]
    UnknownProducer(String),

    #[error("daily post budget of {max} already reached")]
    PostBudgetExhausted { max: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A stage failed with its internal retry budget spent. The class is
    /// derived from the underlying failure when the error is built.
    #[error("stage '{stage}' failed: {message}")]
    StageFailed {
        stage: String,
        kind: String,
        message: String,
        class: ErrorClass,
    },
}

impl PipelineError {
    /// Which recovery policy applies to this failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::GateExhausted { .. } | Self::Timeout { .. } => ErrorClass::Quality,
            Self::InvalidStageInput { .. } | Self::UnknownProducer(_) => ErrorClass::Validation,
            Self::PostBudgetExhausted { .. } | Self::Config(_) | Self::Auth(_) => {
                ErrorClass::Critical
            }
            Self::StageFailed { class, .. } => *class,
        }
    }

    /// Quality failures and exhausted transient budgets end in quarantine:
    /// the partially built context is worth holding for review. Validation
    /// and critical failures surface directly.
    pub fn quarantines(&self) -> bool {
        matches!(self.class(), ErrorClass::Quality | ErrorClass::Transient)
    }
}
