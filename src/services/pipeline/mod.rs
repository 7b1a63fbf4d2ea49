//! Pipeline orchestration.
//!
//! The orchestrator walks a fixed plan of stages and gates. A failing gate
//! rewinds the cursor to the producing stage, attaching structured feedback
//! for the rework; rewinds per gate are bounded. The visual brief and the
//! fact check run concurrently on cloned contexts that are merged back.

pub mod stage;
pub mod stages;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::error::{ContextError, PipelineError};
use crate::domain::models::{
    Config, Context, ForkPoint, GateDefinition, RunReport, RunStatus, StageOutcome, TopicRequest,
};
use crate::domain::ports::{GenerationService, Publisher};
use crate::services::fact_checker::FactChecker;
use crate::services::quality_gate::GateEvaluator;
use crate::services::retry::RetryPolicy;

use stage::{Stage, StageError};
use stages::{
    EditingStage, FactCheckStage, PublicationStage, ResearchStage, SeoMetadataStage,
    VisualBriefStage, WritingStage,
};

/// One step of the execution plan.
enum Step {
    Stage(Arc<dyn Stage>),
    /// Two stages run concurrently on cloned contexts, merged in order.
    Parallel(Arc<dyn Stage>, Arc<dyn Stage>),
    Gate(GateDefinition),
}

/// Runs topic requests through the full synthesis pipeline.
pub struct PipelineOrchestrator {
    steps: Vec<Step>,
    evaluator: GateEvaluator,
    max_feedback_iterations: u32,
    run_deadline_secs: u64,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &Config,
        generation: Arc<dyn GenerationService>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let content = config.content.clone();
        let checker = FactChecker::new(
            generation.clone(),
            retry,
            config.pipeline.confidence_threshold,
        );

        let mut steps = Vec::new();
        steps.push(Step::Stage(Arc::new(ResearchStage::new(
            generation.clone(),
            retry,
        ))));
        steps.push(Step::Stage(Arc::new(WritingStage::new(
            generation.clone(),
            retry,
            content.clone(),
        ))));
        push_gate(&mut steps, config, "draft_review");
        steps.push(Step::Stage(Arc::new(EditingStage::new(
            generation.clone(),
            retry,
            content.clone(),
        ))));
        push_gate(&mut steps, config, "editing_review");
        steps.push(Step::Stage(Arc::new(SeoMetadataStage::new(
            generation.clone(),
            retry,
            content.clone(),
        ))));
        push_gate(&mut steps, config, "seo_review");
        steps.push(Step::Parallel(
            Arc::new(VisualBriefStage::new(generation, retry)),
            Arc::new(FactCheckStage::new(checker)),
        ));
        push_gate(&mut steps, config, "content_validation");
        push_gate(&mut steps, config, "publication");
        steps.push(Step::Stage(Arc::new(PublicationStage::new(
            publisher, retry,
        ))));

        Self {
            steps,
            evaluator: GateEvaluator::new(content),
            max_feedback_iterations: config.pipeline.max_feedback_iterations,
            run_deadline_secs: config.pipeline.run_deadline_secs,
        }
    }

    /// Run one topic request to a terminal state.
    ///
    /// Quality failures (exhausted gates, spent transient budgets, the run
    /// deadline) come back as a `Quarantined` report; validation and critical
    /// failures are returned as errors.
    pub async fn run(&self, request: TopicRequest) -> Result<RunReport, PipelineError> {
        let mut context = Context::new();
        seed_context(&mut context, &request)?;
        info!(
            workflow_id = %context.workflow_id,
            topics = request.topics.len(),
            "pipeline run started"
        );

        let deadline = Duration::from_secs(self.run_deadline_secs);
        let outcome = tokio::time::timeout(deadline, self.run_steps(&mut context)).await;

        let report = match outcome {
            Ok(Ok(())) => {
                let published_url = context
                    .get("published_url")
                    .and_then(Value::as_str)
                    .map(String::from);
                info!(workflow_id = %context.workflow_id, "pipeline run complete");
                RunReport {
                    status: RunStatus::Complete,
                    context,
                    published_url,
                    finished_at: Utc::now(),
                }
            }
            Ok(Err(err)) if err.quarantines() => {
                warn!(workflow_id = %context.workflow_id, error = %err, "run quarantined");
                context.push_error(None, "quarantined", err.to_string());
                RunReport {
                    status: RunStatus::Quarantined,
                    context,
                    published_url: None,
                    finished_at: Utc::now(),
                }
            }
            Ok(Err(err)) => return Err(err),
            Err(_elapsed) => {
                let err = PipelineError::Timeout {
                    deadline_secs: self.run_deadline_secs,
                };
                warn!(workflow_id = %context.workflow_id, error = %err, "run quarantined");
                context.push_error(None, "pipeline_timeout", err.to_string());
                RunReport {
                    status: RunStatus::Quarantined,
                    context,
                    published_url: None,
                    finished_at: Utc::now(),
                }
            }
        };
        Ok(report)
    }

    async fn run_steps(&self, context: &mut Context) -> Result<(), PipelineError> {
        let mut cursor = 0;
        let mut rework_counts: HashMap<String, u32> = HashMap::new();

        while cursor < self.steps.len() {
            match &self.steps[cursor] {
                Step::Stage(stage) => {
                    self.run_stage(stage.as_ref(), context).await?;
                    cursor += 1;
                }
                Step::Parallel(left, right) => {
                    self.run_parallel(left.as_ref(), right.as_ref(), context)
                        .await?;
                    cursor += 1;
                }
                Step::Gate(definition) => {
                    match self.run_gate(definition, context, &mut rework_counts)? {
                        GateVerdict::Proceed => cursor += 1,
                        GateVerdict::Rework(producer_index) => cursor = producer_index,
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_stage(
        &self,
        stage: &dyn Stage,
        context: &mut Context,
    ) -> Result<(), PipelineError> {
        info!(stage = stage.name(), "stage started");
        stage
            .validate_input(context)
            .map_err(|err| invalid_input(stage.name(), err))?;

        match stage.execute(context).await {
            Ok(result) => {
                context.record_stage(stage.name(), StageOutcome::Succeeded);
                debug!(
                    stage = stage.name(),
                    duration_ms = result.duration_ms(),
                    keys = ?result.context_delta,
                    "stage finished"
                );
                Ok(())
            }
            Err(err) => {
                context.push_error(Some(stage.name()), err.kind(), err.to_string());
                context.record_stage(stage.name(), StageOutcome::Failed);
                Err(PipelineError::StageFailed {
                    stage: stage.name().to_string(),
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    class: err.class(),
                })
            }
        }
    }

    async fn run_parallel(
        &self,
        left: &dyn Stage,
        right: &dyn Stage,
        context: &mut Context,
    ) -> Result<(), PipelineError> {
        info!(left = left.name(), right = right.name(), "parallel fork");
        left.validate_input(context)
            .map_err(|err| invalid_input(left.name(), err))?;
        right
            .validate_input(context)
            .map_err(|err| invalid_input(right.name(), err))?;

        let fork = context.fork_point();
        let mut left_context = context.clone();
        let mut right_context = context.clone();
        let (left_result, right_result) = tokio::join!(
            left.execute(&mut left_context),
            right.execute(&mut right_context)
        );

        self.join_branch(left.name(), left_result, &left_context, fork, context)?;
        self.join_branch(right.name(), right_result, &right_context, fork, context)?;
        Ok(())
    }

    /// Fold one parallel branch back into the trunk context.
    fn join_branch(
        &self,
        name: &str,
        result: Result<crate::domain::models::StageResult, StageError>,
        branch: &Context,
        fork: ForkPoint,
        context: &mut Context,
    ) -> Result<(), PipelineError> {
        match result {
            Ok(result) => {
                context
                    .merge_delta(branch, &result.context_delta, fork)
                    .map_err(|err| invalid_input(name, StageError::InvalidInput(err)))?;
                context.record_stage(name, StageOutcome::Succeeded);
                Ok(())
            }
            Err(err) => {
                context.push_error(Some(name), err.kind(), err.to_string());
                context.record_stage(name, StageOutcome::Failed);
                Err(PipelineError::StageFailed {
                    stage: name.to_string(),
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    class: err.class(),
                })
            }
        }
    }

    fn run_gate(
        &self,
        definition: &GateDefinition,
        context: &mut Context,
        rework_counts: &mut HashMap<String, u32>,
    ) -> Result<GateVerdict, PipelineError> {
        let result = self.evaluator.evaluate(definition, context);
        context.record_gate(result.clone());

        if result.passed {
            info!(gate = %definition.name, score = result.score, "gate passed");
            context.feedback.remove(&definition.name);
            return Ok(GateVerdict::Proceed);
        }

        let count = rework_counts.entry(definition.name.clone()).or_insert(0);
        if *count >= self.max_feedback_iterations {
            context.push_error(
                None,
                "gate_exhausted",
                format!(
                    "gate '{}' still failing: {}",
                    definition.name,
                    result.failed_criteria.join(", ")
                ),
            );
            return Err(PipelineError::GateExhausted {
                gate: definition.name.clone(),
                iterations: self.max_feedback_iterations,
            });
        }
        *count += 1;

        info!(
            gate = %definition.name,
            producer = %definition.producer,
            iteration = *count,
            failed = ?result.failed_criteria,
            "gate failed, reworking"
        );
        if let Some(feedback) = result.feedback {
            context.feedback.insert(definition.name.clone(), feedback);
        }
        context.record_stage(&definition.producer, StageOutcome::GateFailed);

        let producer_index = self
            .steps
            .iter()
            .position(|step| matches!(step, Step::Stage(stage) if stage.name() == definition.producer))
            .ok_or_else(|| PipelineError::UnknownProducer(definition.producer.clone()))?;
        Ok(GateVerdict::Rework(producer_index))
    }
}

enum GateVerdict {
    Proceed,
    /// Rewind the plan cursor to the producing stage's index.
    Rework(usize),
}

fn seed_context(context: &mut Context, request: &TopicRequest) -> Result<(), PipelineError> {
    context
        .insert("intake", "topics", json!(request.topics))
        .and_then(|()| {
            context.insert(
                "intake",
                "constraints",
                Value::Object(request.constraints.clone()),
            )
        })
        .map_err(|err| invalid_input("intake", StageError::InvalidInput(err)))
}

fn invalid_input(stage: &str, err: StageError) -> PipelineError {
    match err {
        StageError::InvalidInput(source) => PipelineError::InvalidStageInput {
            stage: stage.to_string(),
            source,
        },
        other => PipelineError::InvalidStageInput {
            stage: stage.to_string(),
            source: ContextError::Malformed {
                key: stage.to_string(),
                reason: other.to_string(),
            },
        },
    }
}

fn push_gate(steps: &mut Vec<Step>, config: &Config, name: &str) {
    match config.gate(name) {
        Some(definition) => steps.push(Step::Gate(definition.clone())),
        None => warn!(gate = name, "gate not configured, skipping"),
    }
}
