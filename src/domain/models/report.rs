//! Run outcome models: assembled posts, reports, persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::context::Context;

/// Terminal status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every gate passed and the post was published.
    Complete,
    /// The run was held for manual review; nothing was published.
    Quarantined,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Quarantined => "quarantined",
        }
    }

    /// Process exit code for this status (0 published, 2 held).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Quarantined => 2,
        }
    }
}

/// Topic request the pipeline caller supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicRequest {
    pub topics: Vec<String>,
    /// Free-form constraints (tone, audience, custom instructions).
    #[serde(default)]
    pub constraints: serde_json::Map<String, serde_json::Value>,
}

/// Media references attached to an assembled post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaReferences {
    pub image_prompt: Option<String>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
}

/// The post handed to the Publishing Service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledPost {
    pub title: String,
    pub body: String,
    pub slug: String,
    pub meta_description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub media: MediaReferences,
}

/// What `PipelineOrchestrator::run` returns to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub context: Context,
    pub published_url: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Persisted on successful publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub workflow_id: Uuid,
    pub title: String,
    pub published_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Persisted when a run is quarantined for manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub workflow_id: Uuid,
    /// Why the run was held (exhausted gate, timeout, publish failure).
    pub reason: String,
    pub quarantined_at: DateTime<Utc>,
    /// Full context: payload, claims, gate results, errors, warnings.
    pub context: Context,
}
