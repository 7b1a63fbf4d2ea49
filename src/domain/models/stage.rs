//! Stage execution result model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::gate::QualityGateResult;

/// Outcome of one stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    /// Payload keys this execution wrote.
    pub context_delta: Vec<String>,
    /// Result of the stage's local gate, when one ran.
    pub local_gate: Option<QualityGateResult>,
}

impl StageResult {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
