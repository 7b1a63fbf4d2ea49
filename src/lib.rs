//! Pressroom - Automated Content Pipeline
//!
//! Pressroom runs topic requests through a staged synthesis pipeline
//! (research, writing, editing, SEO metadata, a parallel visual brief and
//! fact check, then publication) with declarative quality gates between
//! stages and quarantine of runs that cannot meet them.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, error taxonomy, and ports
//! - **Service Layer** (`services`): Orchestration, gate evaluation, scoring
//! - **Infrastructure Layer** (`infrastructure`): HTTP clients, config, artifacts
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use pressroom::services::PipelineOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build clients from config and run a topic request
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{ContextError, ErrorClass, PipelineError, Retryable};
pub use domain::models::{
    AssembledPost, Claim, ClaimKind, Config, ConfidenceLabel, ContentConfig, Context,
    GateCriterion, GateDefinition, GateFeedback, QualityGateResult, RunReport, RunStatus,
    ThresholdMode, TopicRequest, ValidationReport,
};
pub use domain::ports::{GenerationService, Publisher};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{FactChecker, GateEvaluator, PipelineOrchestrator, RetryPolicy, SeoScorer};
