//! Domain models: pure data types with no I/O.

pub mod claim;
pub mod config;
pub mod context;
pub mod gate;
pub mod report;
pub mod stage;

pub use claim::{Claim, ClaimKind, ConfidenceLabel, SeoValue, ValidationReport};
pub use config::{
    Config, ContentConfig, GenerationConfig, LoggingConfig, PipelineConfig, PublisherConfig,
    RetryConfig,
};
pub use context::{Context, ErrorRecord, ForkPoint, StageOutcome, StageRecord};
pub use gate::{GateCriterion, GateDefinition, GateFeedback, QualityGateResult, ThresholdMode};
pub use report::{
    AssembledPost, MediaReferences, PublicationRecord, QuarantineRecord, RunReport, RunStatus,
    TopicRequest,
};
pub use stage::StageResult;
