//! Service layer: orchestration, gate evaluation, scoring, fact checking.

pub mod fact_checker;
pub mod pipeline;
pub mod quality_gate;
pub mod retry;
pub mod seo_scorer;

pub use fact_checker::{FactCheckOutcome, FactChecker};
pub use pipeline::stage::{Stage, StageError};
pub use pipeline::PipelineOrchestrator;
pub use quality_gate::GateEvaluator;
pub use retry::{RetryError, RetryOutcome, RetryPolicy};
pub use seo_scorer::{SeoGrade, SeoReport, SeoScorer};
