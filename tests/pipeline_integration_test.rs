//! End-to-end pipeline runs against scripted generation and publishing stubs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pressroom::domain::models::{
    AssembledPost, Config, GateCriterion, GateDefinition, RunStatus, StageOutcome, ThresholdMode,
    TopicRequest,
};
use pressroom::domain::ports::{
    CompletionRequest, GenerationError, GenerationService, PublishError, PublishReceipt,
    Publisher, ResponseFormat,
};
use pressroom::services::PipelineOrchestrator;

/// Routes completions by requested schema, tracking a per-schema call count.
/// The parallel section makes request order non-deterministic, so a FIFO
/// script would be flaky.
struct SchemaRouter {
    counts: Mutex<HashMap<String, usize>>,
    #[allow(clippy::type_complexity)]
    handler: Box<dyn Fn(&str, usize) -> Result<Value, GenerationError> + Send + Sync>,
}

impl SchemaRouter {
    fn new(
        handler: impl Fn(&str, usize) -> Result<Value, GenerationError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            counts: Mutex::new(HashMap::new()),
            handler: Box::new(handler),
        })
    }

    fn calls(&self, schema: &str) -> usize {
        *self.counts.lock().unwrap().get(schema).unwrap_or(&0)
    }
}

fn schema_of(request: &CompletionRequest) -> &'static str {
    match request.format {
        ResponseFormat::Text => "text",
        ResponseFormat::JsonObject { schema_name, .. }
        | ResponseFormat::JsonArray { schema_name, .. } => schema_name,
    }
}

#[async_trait]
impl GenerationService for SchemaRouter {
    async fn complete(&self, request: CompletionRequest) -> Result<Value, GenerationError> {
        let schema = schema_of(&request);
        let count = {
            let mut counts = self.counts.lock().unwrap();
            let entry = counts.entry(schema.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        (self.handler)(schema, count)
    }
}

struct CountingPublisher {
    calls: AtomicUsize,
}

impl CountingPublisher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Publisher for CountingPublisher {
    async fn publish(&self, post: &AssembledPost) -> Result<PublishReceipt, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PublishReceipt {
            published_url: Some(format!("https://example.com/p/{}", post.slug)),
        })
    }
}

/// Config tuned for fast tests: tiny backoff, small content windows, and
/// gates built around the short fixture content.
fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.max_attempts = 3;
    config.retry.initial_delay_ms = 1;
    config.retry.multiplier = 1.0;
    config.retry.max_delay_ms = 10;
    config.pipeline.max_feedback_iterations = 2;
    config.pipeline.run_deadline_secs = 30;
    config.content.min_word_count = 5;
    config.gates = vec![
        GateDefinition {
            name: "draft_review".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::MinWordCount { min: 5 }],
        },
        GateDefinition {
            name: "editing_review".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::MinWordCount { min: 5 }],
        },
        GateDefinition {
            name: "seo_review".to_string(),
            producer: "seo_metadata".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::RequiredKey {
                    key: "slug".to_string(),
                },
                GateCriterion::RequiredKey {
                    key: "meta_description".to_string(),
                },
            ],
        },
        GateDefinition {
            name: "content_validation".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinAverageConfidence { min: 0.7 },
                GateCriterion::MaxFlaggedClaims { max: 0 },
            ],
        },
        GateDefinition {
            name: "publication".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::AllGatesPassed],
        },
    ];
    config
}

fn happy_response(schema: &str) -> Result<Value, GenerationError> {
    match schema {
        "research" => Ok(json!({
            "trending_topics": ["how async runtimes shape service design"],
            "keywords": ["rust", "async"],
        })),
        "draft" => Ok(json!({
            "title": "Async Rust in Production Services",
            "draft_content": "Async runtimes now carry most new rust services in production today.",
        })),
        "edit" => Ok(json!({
            "edited_content": "Async runtimes carry most new rust services. Teams adopt them early and stay.",
        })),
        "seo_metadata" => Ok(json!({
            "meta_description": "How async runtimes shape production rust services.",
            "tags": ["rust", "async", "services"],
        })),
        "visual_brief" => Ok(json!({
            "visual_prompt": "a clean diagram of request flow through an async runtime",
            "alt_text": "diagram of async request flow",
            "caption": "Where requests spend their time.",
        })),
        "claims" => Ok(json!([
            { "text": "Async runtimes carry most new rust services", "kind": "fact" },
        ])),
        "claim_validation" => Ok(json!({ "label": "ACCURATE", "seo_value": "high" })),
        other => Err(GenerationError::InvalidRequest(format!(
            "unexpected schema '{other}'"
        ))),
    }
}

fn request() -> TopicRequest {
    TopicRequest {
        topics: vec!["rust async runtimes".to_string()],
        constraints: serde_json::Map::new(),
    }
}

#[tokio::test]
async fn test_clean_article_publishes() {
    let generation = SchemaRouter::new(|schema, _count| happy_response(schema));
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&test_config(), generation.clone(), publisher.clone());

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Complete);
    assert!(report.published_url.as_deref().unwrap().contains("async-rust"));
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
    assert!(report.context.all_gates_passed());
    assert_eq!(report.context.quality_gate_results.len(), 5);
    for key in [
        "trending_topics",
        "keywords",
        "title",
        "draft_content",
        "edited_content",
        "slug",
        "meta_description",
        "tags",
        "seo_report",
        "visual_prompt",
        "fact_check_report",
        "published_url",
    ] {
        assert!(report.context.contains_key(key), "missing payload key {key}");
    }
    // One pass through each generation-backed stage.
    assert_eq!(generation.calls("draft"), 1);
    assert_eq!(generation.calls("edit"), 1);
}

#[tokio::test]
async fn test_parallel_branches_write_disjoint_keys() {
    let generation = SchemaRouter::new(|schema, _count| happy_response(schema));
    let publisher = CountingPublisher::new();
    let orchestrator = PipelineOrchestrator::new(&test_config(), generation, publisher);

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.context.writer_of("visual_prompt"), Some("visual_brief"));
    assert_eq!(report.context.writer_of("alt_text"), Some("visual_brief"));
    assert_eq!(
        report.context.writer_of("fact_check_report"),
        Some("fact_check")
    );
    let stages: Vec<&str> = report
        .context
        .stage_history
        .iter()
        .map(|r| r.stage_name.as_str())
        .collect();
    assert!(stages.contains(&"visual_brief"));
    assert!(stages.contains(&"fact_check"));
}

#[tokio::test]
async fn test_vague_article_is_quarantined() {
    // Every claim validates UNCERTAIN, so content_validation can never pass.
    let generation = SchemaRouter::new(|schema, _count| match schema {
        "claims" => Ok(json!([
            { "text": "Everyone knows this framework is best", "kind": "opinion" },
        ])),
        "claim_validation" => Ok(json!({ "label": "UNCERTAIN", "seo_value": "low" })),
        other => happy_response(other),
    });
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&test_config(), generation.clone(), publisher.clone());

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Quarantined);
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    assert!(report.published_url.is_none());

    let gate = &report.context.quality_gate_results["content_validation"];
    assert!(!gate.passed);
    assert!(gate
        .failed_criteria
        .contains(&"min_average_confidence".to_string()));
    let feedback = gate.feedback.as_ref().unwrap();
    assert!(!feedback.focus_areas.is_empty());

    // Feedback budget of 2 means the producing stage ran 1 + 2 times.
    assert_eq!(generation.calls("draft"), 3);
    assert!(report
        .context
        .errors
        .iter()
        .any(|e| e.kind == "gate_exhausted"));
}

#[tokio::test]
async fn test_transient_failure_recovers_within_retry_budget() {
    let generation = SchemaRouter::new(|schema, count| match schema {
        "research" if count <= 2 => Err(GenerationError::Timeout),
        other => happy_response(other),
    });
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&test_config(), generation.clone(), publisher);

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Complete);
    // Two timeouts, then success, all inside one stage execution.
    assert_eq!(generation.calls("research"), 3);
}

#[tokio::test]
async fn test_exhausted_retries_quarantine_the_run() {
    let generation = SchemaRouter::new(|schema, _count| match schema {
        "draft" => Err(GenerationError::Unavailable("503".to_string())),
        other => happy_response(other),
    });
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&test_config(), generation.clone(), publisher.clone());

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Quarantined);
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    // Full retry budget spent on the failing stage.
    assert_eq!(generation.calls("draft"), 3);
    assert!(report
        .context
        .errors
        .iter()
        .any(|e| e.stage.as_deref() == Some("writing") && e.kind == "unavailable"));
}

#[tokio::test]
async fn test_auth_failure_is_returned_not_quarantined() {
    let generation = SchemaRouter::new(|schema, _count| match schema {
        "research" => Err(GenerationError::Auth("invalid api key".to_string())),
        other => happy_response(other),
    });
    let publisher = CountingPublisher::new();
    let orchestrator = PipelineOrchestrator::new(&test_config(), generation, publisher.clone());

    let err = orchestrator.run(request()).await.unwrap_err();
    assert!(!err.quarantines());
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_deadline_quarantines() {
    struct SlowGeneration;

    #[async_trait]
    impl GenerationService for SlowGeneration {
        async fn complete(&self, request: CompletionRequest) -> Result<Value, GenerationError> {
            if schema_of(&request) == "research" {
                return happy_response("research");
            }
            // Longer than the run deadline.
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(GenerationError::Timeout)
        }
    }

    let mut config = test_config();
    config.pipeline.run_deadline_secs = 1;
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&config, Arc::new(SlowGeneration), publisher.clone());

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Quarantined);
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    assert!(report
        .context
        .errors
        .iter()
        .any(|e| e.kind == "pipeline_timeout"));
}

#[tokio::test]
async fn test_draft_gate_feedback_reinvokes_writer() {
    // First draft is too short for the gate; the rework passes.
    let generation = SchemaRouter::new(|schema, count| match schema {
        "draft" if count == 1 => Ok(json!({
            "title": "Too Short",
            "draft_content": "Tiny draft.",
        })),
        other => happy_response(other),
    });
    let publisher = CountingPublisher::new();
    let orchestrator =
        PipelineOrchestrator::new(&test_config(), generation.clone(), publisher);

    let report = orchestrator.run(request()).await.unwrap();

    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(generation.calls("draft"), 2);
    // The gate's latest recorded result is the passing one.
    assert!(report.context.quality_gate_results["draft_review"].passed);
    // Exactly one history record per rework: first pass, gate failure, rework.
    let writing_outcomes: Vec<StageOutcome> = report
        .context
        .stage_history
        .iter()
        .filter(|r| r.stage_name == "writing")
        .map(|r| r.outcome)
        .collect();
    assert_eq!(
        writing_outcomes,
        vec![
            StageOutcome::Succeeded,
            StageOutcome::GateFailed,
            StageOutcome::Succeeded,
        ]
    );
}
