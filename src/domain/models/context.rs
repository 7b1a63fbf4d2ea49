//! Workflow context model.
//!
//! The `Context` is the single accumulating object threaded through the
//! pipeline. Stages receive it by value and hand back an updated copy;
//! nothing mutates a context another stage still holds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::ContextError;
use crate::domain::models::gate::{GateFeedback, QualityGateResult};

/// Outcome of one stage execution, recorded in the stage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Succeeded,
    Failed,
    /// The stage's output failed a downstream gate; the stage reruns.
    GateFailed,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::GateFailed => "gate_failed",
        }
    }
}

/// One entry in the append-only stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage_name: String,
    pub recorded_at: DateTime<Utc>,
    pub outcome: StageOutcome,
}

/// A non-fatal error accumulated during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Stage that observed the error, if any.
    pub stage: Option<String>,
    /// Machine-readable error kind (e.g. "timeout", "retry_exhausted").
    pub kind: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// The accumulating data object threaded through the pipeline.
///
/// Payload keys are write-once across stages: a stage may replace values it
/// wrote itself (a feedback retry re-runs the producer), but never a key
/// owned by another stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub workflow_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub stage_history: Vec<StageRecord>,
    payload: HashMap<String, Value>,
    /// Which stage wrote each payload key.
    writers: HashMap<String, String>,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<String>,
    /// Latest result per gate name.
    pub quality_gate_results: HashMap<String, QualityGateResult>,
    /// Feedback pending for a producing stage, keyed by gate name.
    /// Replaced wholesale on each feedback iteration.
    pub feedback: HashMap<String, GateFeedback>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            workflow_id: Uuid::new_v4(),
            created_at: Utc::now(),
            stage_history: Vec::new(),
            payload: HashMap::new(),
            writers: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            quality_gate_results: HashMap::new(),
            feedback: HashMap::new(),
        }
    }

    /// Write a payload key on behalf of `stage`.
    ///
    /// Fails if the key is already owned by a different stage.
    pub fn insert(
        &mut self,
        stage: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), ContextError> {
        let key = key.into();
        if let Some(owner) = self.writers.get(&key) {
            if owner != stage {
                return Err(ContextError::ForeignKeyOverwrite {
                    key,
                    owner: owner.clone(),
                    writer: stage.to_string(),
                });
            }
        }
        self.writers.insert(key.clone(), stage.to_string());
        self.payload.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Fetch a required payload key, failing with the missing key name.
    pub fn require(&self, key: &str) -> Result<&Value, ContextError> {
        self.payload
            .get(key)
            .ok_or_else(|| ContextError::MissingKey(key.to_string()))
    }

    /// Fetch and deserialize a required payload key.
    pub fn require_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        let value = self.require(key)?;
        serde_json::from_value(value.clone()).map_err(|e| ContextError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.payload.contains_key(key)
    }

    /// Stage that wrote `key`, if any.
    pub fn writer_of(&self, key: &str) -> Option<&str> {
        self.writers.get(key).map(String::as_str)
    }

    pub fn record_stage(&mut self, stage_name: &str, outcome: StageOutcome) {
        self.stage_history.push(StageRecord {
            stage_name: stage_name.to_string(),
            recorded_at: Utc::now(),
            outcome,
        });
    }

    pub fn push_error(&mut self, stage: Option<&str>, kind: &str, message: impl Into<String>) {
        self.errors.push(ErrorRecord {
            stage: stage.map(ToString::to_string),
            kind: kind.to_string(),
            message: message.into(),
            occurred_at: Utc::now(),
        });
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn record_gate(&mut self, result: QualityGateResult) {
        self.quality_gate_results
            .insert(result.gate_name.clone(), result);
    }

    /// True when every recorded gate passed and at least one gate ran.
    pub fn all_gates_passed(&self) -> bool {
        !self.quality_gate_results.is_empty()
            && self.quality_gate_results.values().all(|r| r.passed)
    }

    /// Snapshot the append-only vector lengths before forking branch clones.
    /// Branch merges copy entries past these marks, so the first merge growing
    /// the trunk cannot shadow the second branch's entries.
    pub fn fork_point(&self) -> ForkPoint {
        ForkPoint {
            stage_history: self.stage_history.len(),
            errors: self.errors.len(),
            warnings: self.warnings.len(),
        }
    }

    /// Merge the payload delta a parallel branch produced on a clone of this
    /// context. Branch deltas write disjoint key sets by construction; a
    /// colliding key from a different writer is a contract violation.
    /// `fork` must be the snapshot taken before the branch was cloned.
    pub fn merge_delta(
        &mut self,
        branch: &Context,
        keys: &[String],
        fork: ForkPoint,
    ) -> Result<(), ContextError> {
        for key in keys {
            let value = branch.require(key)?.clone();
            let writer = branch
                .writer_of(key)
                .ok_or_else(|| ContextError::MissingKey(key.clone()))?
                .to_string();
            self.insert(&writer, key.clone(), value)?;
        }
        // Branch-local history, errors, warnings, and gate results come along too.
        for record in branch.stage_history.iter().skip(fork.stage_history) {
            self.stage_history.push(record.clone());
        }
        for error in branch.errors.iter().skip(fork.errors) {
            self.errors.push(error.clone());
        }
        for warning in branch.warnings.iter().skip(fork.warnings) {
            self.warnings.push(warning.clone());
        }
        for result in branch.quality_gate_results.values() {
            self.record_gate(result.clone());
        }
        Ok(())
    }
}

/// Append-only vector lengths at the moment a parallel fork cloned the
/// context.
#[derive(Debug, Clone, Copy)]
pub struct ForkPoint {
    stage_history: usize,
    errors: usize,
    warnings: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_require() {
        let mut ctx = Context::new();
        ctx.insert("writing", "draft_content", json!("hello"))
            .unwrap();
        assert_eq!(ctx.require("draft_content").unwrap(), &json!("hello"));
        assert_eq!(ctx.writer_of("draft_content"), Some("writing"));
    }

    #[test]
    fn test_same_stage_may_replace_its_own_key() {
        let mut ctx = Context::new();
        ctx.insert("writing", "draft_content", json!("v1")).unwrap();
        ctx.insert("writing", "draft_content", json!("v2")).unwrap();
        assert_eq!(ctx.require("draft_content").unwrap(), &json!("v2"));
    }

    #[test]
    fn test_foreign_stage_overwrite_rejected() {
        let mut ctx = Context::new();
        ctx.insert("writing", "draft_content", json!("v1")).unwrap();
        let err = ctx
            .insert("editing", "draft_content", json!("v2"))
            .unwrap_err();
        assert!(matches!(err, ContextError::ForeignKeyOverwrite { .. }));
        // Original value untouched
        assert_eq!(ctx.require("draft_content").unwrap(), &json!("v1"));
    }

    #[test]
    fn test_require_missing_key() {
        let ctx = Context::new();
        let err = ctx.require("nope").unwrap_err();
        assert!(matches!(err, ContextError::MissingKey(_)));
    }

    #[test]
    fn test_stage_history_is_append_only_ordered() {
        let mut ctx = Context::new();
        ctx.record_stage("research", StageOutcome::Succeeded);
        ctx.record_stage("writing", StageOutcome::GateFailed);
        ctx.record_stage("writing", StageOutcome::Succeeded);
        let names: Vec<_> = ctx
            .stage_history
            .iter()
            .map(|r| r.stage_name.as_str())
            .collect();
        assert_eq!(names, vec!["research", "writing", "writing"]);
    }

    #[test]
    fn test_merge_delta_disjoint_keys() {
        let mut base = Context::new();
        base.insert("editing", "edited_content", json!("body"))
            .unwrap();

        let fork = base.fork_point();
        let mut visual = base.clone();
        visual
            .insert("visual_brief", "visual_prompt", json!("a prompt"))
            .unwrap();

        let mut facts = base.clone();
        facts
            .insert("fact_check", "fact_check_report", json!({"claims": []}))
            .unwrap();

        base.merge_delta(&visual, &["visual_prompt".to_string()], fork)
            .unwrap();
        base.merge_delta(&facts, &["fact_check_report".to_string()], fork)
            .unwrap();

        assert!(base.contains_key("visual_prompt"));
        assert!(base.contains_key("fact_check_report"));
        assert_eq!(base.writer_of("visual_prompt"), Some("visual_brief"));
    }

    #[test]
    fn test_merge_delta_keeps_entries_from_both_branches() {
        let mut base = Context::new();
        base.push_warning("pre-fork warning");
        base.record_stage("editing", StageOutcome::Succeeded);

        let fork = base.fork_point();
        let mut visual = base.clone();
        visual.push_warning("visual brief degraded");
        visual.record_stage("visual_brief", StageOutcome::Succeeded);

        let mut facts = base.clone();
        facts.push_warning("claim extraction fell back");
        facts.push_error(Some("fact_check"), "timeout", "validation timed out");
        facts.record_stage("fact_check", StageOutcome::Succeeded);

        base.merge_delta(&visual, &[], fork).unwrap();
        // The first merge grew the trunk; the second branch's entries at the
        // same positions must still come across.
        base.merge_delta(&facts, &[], fork).unwrap();

        assert_eq!(
            base.warnings,
            vec![
                "pre-fork warning",
                "visual brief degraded",
                "claim extraction fell back",
            ]
        );
        assert_eq!(base.errors.len(), 1);
        assert_eq!(base.errors[0].stage.as_deref(), Some("fact_check"));
        let stages: Vec<&str> = base
            .stage_history
            .iter()
            .map(|r| r.stage_name.as_str())
            .collect();
        assert_eq!(stages, vec!["editing", "visual_brief", "fact_check"]);
    }

    #[test]
    fn test_all_gates_passed_requires_at_least_one() {
        let ctx = Context::new();
        assert!(!ctx.all_gates_passed());
    }
}
