//! Concrete pipeline stages.
//!
//! Payload key ownership:
//! - `research` writes `trending_topics`, `keywords`
//! - `writing` writes `title`, `draft_content`
//! - `editing` writes `edited_content`
//! - `seo_metadata` writes `slug`, `meta_description`, `tags`, `seo_report`
//! - `visual_brief` writes `visual_prompt`, `alt_text`, `caption`
//! - `fact_check` writes `fact_check_report`
//! - `publication` writes `published_url`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::models::{
    AssembledPost, ContentConfig, Context, MediaReferences, StageResult,
};
use crate::domain::ports::{
    CompletionRequest, GenerationError, GenerationService, Publisher, ResponseFormat,
};
use crate::services::fact_checker::FactChecker;
use crate::services::pipeline::stage::{stage_result, Stage, StageError};
use crate::services::retry::RetryPolicy;
use crate::services::seo_scorer::{
    meta_description_fallback, slugify, SeoInputs, SeoScorer,
};

const MAX_SLUG_LENGTH: usize = 60;

/// Pull a required key out of a structured response.
fn field(value: &Value, schema: &'static str, key: &str) -> Result<Value, StageError> {
    value.get(key).cloned().ok_or(StageError::Generation {
        attempts: 1,
        source: GenerationError::Malformed {
            schema: schema.to_string(),
            reason: format!("missing key '{key}'"),
        },
    })
}

/// Render pending gate feedback into prompt guidance for a re-invoked
/// producer. Empty when no gate is currently asking for a rework.
fn feedback_digest(context: &Context) -> Option<String> {
    if context.feedback.is_empty() {
        return None;
    }
    let mut lines = vec!["A quality review rejected the previous version.".to_string()];
    for (gate, feedback) in &context.feedback {
        if feedback.focus_areas.is_empty() {
            continue;
        }
        lines.push(format!(
            "Review '{gate}' asks you to fix: {}.",
            feedback.focus_areas.join(", ")
        ));
        for (criterion, target) in &feedback.targets {
            lines.push(format!("  {criterion}: target {target}"));
        }
    }
    Some(lines.join("\n"))
}

fn with_feedback(base: String, context: &Context) -> String {
    match feedback_digest(context) {
        Some(digest) => format!("{base}\n\n{digest}"),
        None => base,
    }
}

/// Surveys the requested topics and picks the angle plus focus keywords.
pub struct ResearchStage {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl ResearchStage {
    pub fn new(generation: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self { generation, retry }
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> &'static str {
        "research"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["topics"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let topics: Vec<String> = context.require_as("topics")?;
        let constraints = context
            .get("constraints")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let request = CompletionRequest::new(
            "You are a research analyst for a publication. Survey the requested topics, \
             pick the most compelling current angle, and return trending_topics (an array \
             of short angle summaries, strongest first) and keywords (an array of focus \
             keywords for the piece).",
            json!({ "topics": topics, "constraints": constraints }).to_string(),
            ResponseFormat::JsonObject {
                schema_name: "research",
                required_keys: &["trending_topics", "keywords"],
            },
        );
        let outcome = self
            .retry
            .execute(|| self.generation.complete(request.clone()))
            .await?;

        let trending = field(&outcome.value, "research", "trending_topics")?;
        let keywords = field(&outcome.value, "research", "keywords")?;
        context.insert(self.name(), "trending_topics", trending)?;
        context.insert(self.name(), "keywords", keywords)?;

        info!(stage = self.name(), "research complete");
        Ok(stage_result(
            self.name(),
            started_at,
            vec!["trending_topics".to_string(), "keywords".to_string()],
        ))
    }
}

/// Drafts the article from the research output.
pub struct WritingStage {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    content: ContentConfig,
}

impl WritingStage {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        content: ContentConfig,
    ) -> Self {
        Self {
            generation,
            retry,
            content,
        }
    }
}

#[async_trait]
impl Stage for WritingStage {
    fn name(&self) -> &'static str {
        "writing"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["trending_topics", "keywords"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let trending = context.require("trending_topics")?.clone();
        let keywords = context.require("keywords")?.clone();

        let instructions = with_feedback(
            format!(
                "You are a staff writer. Write an engaging long-form article in Markdown \
                 between {} and {} words, with headings and short paragraphs. Weave the \
                 focus keywords in naturally. Return the title and the article body as \
                 draft_content.",
                self.content.min_word_count, self.content.max_word_count
            ),
            context,
        );
        let request = CompletionRequest::new(
            instructions,
            json!({ "trending_topics": trending, "keywords": keywords }).to_string(),
            ResponseFormat::JsonObject {
                schema_name: "draft",
                required_keys: &["title", "draft_content"],
            },
        );
        let outcome = self
            .retry
            .execute(|| self.generation.complete(request.clone()))
            .await?;

        let title = field(&outcome.value, "draft", "title")?;
        let draft = field(&outcome.value, "draft", "draft_content")?;
        context.insert(self.name(), "title", title)?;
        context.insert(self.name(), "draft_content", draft)?;

        info!(stage = self.name(), "draft written");
        Ok(stage_result(
            self.name(),
            started_at,
            vec!["title".to_string(), "draft_content".to_string()],
        ))
    }
}

/// Polishes the draft for clarity, flow, and length.
pub struct EditingStage {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    content: ContentConfig,
}

impl EditingStage {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        content: ContentConfig,
    ) -> Self {
        Self {
            generation,
            retry,
            content,
        }
    }
}

#[async_trait]
impl Stage for EditingStage {
    fn name(&self) -> &'static str {
        "editing"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["draft_content"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let draft: String = context.require_as("draft_content")?;

        let instructions = with_feedback(
            format!(
                "You are a senior editor. Tighten the article for clarity and flow, keep \
                 sentences near {} words, preserve the Markdown structure, and keep the \
                 length between {} and {} words. Return the full revised article as \
                 edited_content.",
                self.content.optimal_sentence_words,
                self.content.min_word_count,
                self.content.max_word_count
            ),
            context,
        );
        let request = CompletionRequest::new(
            instructions,
            draft,
            ResponseFormat::JsonObject {
                schema_name: "edit",
                required_keys: &["edited_content"],
            },
        );
        let outcome = self
            .retry
            .execute(|| self.generation.complete(request.clone()))
            .await?;

        let edited = field(&outcome.value, "edit", "edited_content")?;
        context.insert(self.name(), "edited_content", edited)?;

        info!(stage = self.name(), "edit complete");
        Ok(stage_result(
            self.name(),
            started_at,
            vec!["edited_content".to_string()],
        ))
    }
}

/// Produces slug, meta description, tags, and the deterministic SEO report.
pub struct SeoMetadataStage {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    content: ContentConfig,
    scorer: SeoScorer,
}

impl SeoMetadataStage {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        content: ContentConfig,
    ) -> Self {
        let scorer = SeoScorer::new(content.clone());
        Self {
            generation,
            retry,
            content,
            scorer,
        }
    }

    async fn generate_metadata(
        &self,
        title: &str,
        body: &str,
        keywords: &[String],
    ) -> Result<(String, Vec<String>), StageError> {
        let instructions = format!(
            "You are an SEO specialist. Write a meta description between {} and {} \
             characters and pick 3 to 8 tags for the article. The focus keywords are: {}.",
            self.content.meta_min_chars,
            self.content.meta_max_chars,
            keywords.join(", ")
        );
        let request = CompletionRequest::new(
            instructions,
            format!("Title: {title}\n\n{body}"),
            ResponseFormat::JsonObject {
                schema_name: "seo_metadata",
                required_keys: &["meta_description", "tags"],
            },
        );
        let outcome = self
            .retry
            .execute(|| self.generation.complete(request.clone()))
            .await?;

        let meta = field(&outcome.value, "seo_metadata", "meta_description")?;
        let meta: String = serde_json::from_value(meta).map_err(|e| StageError::Generation {
            attempts: 1,
            source: GenerationError::Malformed {
                schema: "seo_metadata".to_string(),
                reason: e.to_string(),
            },
        })?;
        let tags: Vec<String> = serde_json::from_value(field(&outcome.value, "seo_metadata", "tags")?)
            .unwrap_or_default();
        Ok((meta, tags))
    }
}

#[async_trait]
impl Stage for SeoMetadataStage {
    fn name(&self) -> &'static str {
        "seo_metadata"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["title", "edited_content", "keywords"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let title: String = context.require_as("title")?;
        let body: String = context.require_as("edited_content")?;
        let keywords: Vec<String> = context.require_as("keywords")?;

        let (meta_description, tags) = match self.generate_metadata(&title, &body, &keywords).await
        {
            Ok(metadata) => metadata,
            Err(err) if err.class() != crate::domain::error::ErrorClass::Critical => {
                // Metadata is recoverable locally; fall back rather than
                // failing the whole run.
                warn!(error = %err, "metadata generation failed, using fallbacks");
                context.push_warning(format!(
                    "seo metadata generation failed ({err}); deterministic fallback used"
                ));
                let meta = meta_description_fallback(&body, self.content.meta_max_chars);
                (meta, keywords.clone())
            }
            Err(err) => return Err(err),
        };

        let slug = slugify(&title, MAX_SLUG_LENGTH);
        let report = self.scorer.score(&SeoInputs {
            title: &title,
            body: &body,
            meta_description: Some(&meta_description),
            tags: &tags,
            keywords: &keywords,
        });
        info!(
            stage = self.name(),
            overall = report.overall,
            grade = report.grade.as_str(),
            "seo report computed"
        );

        let report_value = serde_json::to_value(&report).map_err(|e| StageError::Generation {
            attempts: 1,
            source: GenerationError::Malformed {
                schema: "seo_report".to_string(),
                reason: e.to_string(),
            },
        })?;
        context.insert(self.name(), "slug", json!(slug))?;
        context.insert(self.name(), "meta_description", json!(meta_description))?;
        context.insert(self.name(), "tags", json!(tags))?;
        context.insert(self.name(), "seo_report", report_value)?;

        Ok(stage_result(
            self.name(),
            started_at,
            vec![
                "slug".to_string(),
                "meta_description".to_string(),
                "tags".to_string(),
                "seo_report".to_string(),
            ],
        ))
    }
}

/// Describes the hero image for the piece: prompt, alt text, caption.
pub struct VisualBriefStage {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl VisualBriefStage {
    pub fn new(generation: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self { generation, retry }
    }
}

#[async_trait]
impl Stage for VisualBriefStage {
    fn name(&self) -> &'static str {
        "visual_brief"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["title", "edited_content"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let title: String = context.require_as("title")?;
        let body: String = context.require_as("edited_content")?;

        let request = CompletionRequest::new(
            "You are an art director. Describe one hero image for the article: a \
             generation prompt (visual_prompt), accessible alt text (alt_text), and a \
             one-line caption (caption).",
            format!("Title: {title}\n\n{body}"),
            ResponseFormat::JsonObject {
                schema_name: "visual_brief",
                required_keys: &["visual_prompt", "alt_text", "caption"],
            },
        );
        let outcome = self
            .retry
            .execute(|| self.generation.complete(request.clone()))
            .await?;

        for key in ["visual_prompt", "alt_text", "caption"] {
            let value = field(&outcome.value, "visual_brief", key)?;
            context.insert(self.name(), key, value)?;
        }

        info!(stage = self.name(), "visual brief ready");
        Ok(stage_result(
            self.name(),
            started_at,
            vec![
                "visual_prompt".to_string(),
                "alt_text".to_string(),
                "caption".to_string(),
            ],
        ))
    }
}

/// Runs claim extraction and validation over the edited body.
pub struct FactCheckStage {
    checker: FactChecker,
}

impl FactCheckStage {
    pub fn new(checker: FactChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Stage for FactCheckStage {
    fn name(&self) -> &'static str {
        "fact_check"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["edited_content"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let body: String = context.require_as("edited_content")?;

        let outcome = self.checker.check(&body).await;
        for warning in outcome.warnings {
            context.push_warning(warning);
        }
        info!(
            stage = self.name(),
            claims = outcome.report.claims.len(),
            flagged = outcome.report.flagged_count,
            average_confidence = outcome.report.average_confidence,
            "fact check complete"
        );

        let report_value =
            serde_json::to_value(&outcome.report).map_err(|e| StageError::Generation {
                attempts: 1,
                source: GenerationError::Malformed {
                    schema: "fact_check_report".to_string(),
                    reason: e.to_string(),
                },
            })?;
        context.insert(self.name(), "fact_check_report", report_value)?;

        Ok(stage_result(
            self.name(),
            started_at,
            vec!["fact_check_report".to_string()],
        ))
    }
}

/// Assembles the final post and hands it to the publishing service.
pub struct PublicationStage {
    publisher: Arc<dyn Publisher>,
    retry: RetryPolicy,
}

impl PublicationStage {
    pub fn new(publisher: Arc<dyn Publisher>, retry: RetryPolicy) -> Self {
        Self { publisher, retry }
    }

    /// Build the post from the accumulated payload. Visual keys are optional;
    /// everything else must be present.
    pub fn assemble(context: &Context) -> Result<AssembledPost, StageError> {
        let media = MediaReferences {
            image_prompt: context.get("visual_prompt").and_then(Value::as_str).map(String::from),
            alt_text: context.get("alt_text").and_then(Value::as_str).map(String::from),
            caption: context.get("caption").and_then(Value::as_str).map(String::from),
        };
        Ok(AssembledPost {
            title: context.require_as("title")?,
            body: context.require_as("edited_content")?,
            slug: context.require_as("slug")?,
            meta_description: context.require_as("meta_description")?,
            tags: context.require_as("tags")?,
            media,
        })
    }
}

#[async_trait]
impl Stage for PublicationStage {
    fn name(&self) -> &'static str {
        "publication"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &["title", "edited_content", "slug", "meta_description", "tags"]
    }

    async fn execute(&self, context: &mut Context) -> Result<StageResult, StageError> {
        let started_at = Utc::now();
        let post = Self::assemble(context)?;

        let outcome = self
            .retry
            .execute(|| self.publisher.publish(&post))
            .await?;
        let url = outcome.value.published_url;
        info!(stage = self.name(), url = url.as_deref(), "post published");

        context.insert(
            self.name(),
            "published_url",
            url.map_or(Value::Null, Value::String),
        )?;
        Ok(stage_result(
            self.name(),
            started_at,
            vec!["published_url".to_string()],
        ))
    }
}
