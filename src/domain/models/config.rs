//! Configuration model.
//!
//! Loaded once by `infrastructure::config::ConfigLoader` and passed into the
//! orchestrator at construction; never read through ambient globals.

use serde::{Deserialize, Serialize};

use crate::domain::models::gate::{GateCriterion, GateDefinition, ThresholdMode};

/// Main configuration structure for pressroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Generation service (completion API) configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Publishing service configuration
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Retry policy for unreliable calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Content measurement windows used by the SEO scorer and gates
    #[serde(default)]
    pub content: ContentConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Quality gate definitions, in pipeline order
    #[serde(default = "default_gates")]
    pub gates: Vec<GateDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            publisher: PublisherConfig::default(),
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
            content: ContentConfig::default(),
            logging: LoggingConfig::default(),
            gates: default_gates(),
        }
    }
}

impl Config {
    /// Look up a gate definition by name.
    pub fn gate(&self, name: &str) -> Option<&GateDefinition> {
        self.gates.iter().find(|g| g.name == name)
    }
}

/// Generation service client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// API key; usually supplied via `PRESSROOM_GENERATION__API_KEY`
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests per second allowed against the service
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: f64,
}

fn default_generation_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

const fn default_generation_timeout_secs() -> u64 {
    120
}

const fn default_rate_limit_rps() -> f64 {
    5.0
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_generation_base_url(),
            model: default_model(),
            timeout_secs: default_generation_timeout_secs(),
            rate_limit_rps: default_rate_limit_rps(),
        }
    }
}

/// Publishing service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PublisherConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Publication identifier posts are created under
    #[serde(default)]
    pub publication: String,

    #[serde(default = "default_publisher_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_publisher_timeout_secs() -> u64 {
    60
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            publication: String::new(),
            timeout_secs: default_publisher_timeout_secs(),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts, including the first (must be >= 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff multiplier applied per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_delay_ms() -> u64 {
    1_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Pipeline behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Bounded feedback-loop retries per gate
    #[serde(default = "default_max_feedback_iterations")]
    pub max_feedback_iterations: u32,

    /// Overall run deadline in seconds; exceeding it quarantines the run
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,

    /// Claims below this confidence are flagged for review
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Directory for publication records and quarantined runs
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum posts published per calendar day
    #[serde(default = "default_max_posts_per_day")]
    pub max_posts_per_day: u32,
}

const fn default_max_feedback_iterations() -> u32 {
    3
}

const fn default_run_deadline_secs() -> u64 {
    1_800
}

const fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_output_dir() -> String {
    "generated_content".to_string()
}

const fn default_max_posts_per_day() -> u32 {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_feedback_iterations: default_max_feedback_iterations(),
            run_deadline_secs: default_run_deadline_secs(),
            confidence_threshold: default_confidence_threshold(),
            output_dir: default_output_dir(),
            max_posts_per_day: default_max_posts_per_day(),
        }
    }
}

/// Optimal content windows used by the SEO scorer and default gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContentConfig {
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,

    #[serde(default = "default_max_word_count")]
    pub max_word_count: usize,

    /// Optimal title length window in characters
    #[serde(default = "default_title_min_chars")]
    pub title_min_chars: usize,

    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Optimal meta description window in characters
    #[serde(default = "default_meta_min_chars")]
    pub meta_min_chars: usize,

    #[serde(default = "default_meta_max_chars")]
    pub meta_max_chars: usize,

    /// Keyword density window in percent of total words
    #[serde(default = "default_keyword_density_min_pct")]
    pub keyword_density_min_pct: f64,

    #[serde(default = "default_keyword_density_max_pct")]
    pub keyword_density_max_pct: f64,

    /// Words per sentence above which readability starts degrading
    #[serde(default = "default_optimal_sentence_words")]
    pub optimal_sentence_words: usize,
}

const fn default_min_word_count() -> usize {
    600
}

const fn default_max_word_count() -> usize {
    2_500
}

const fn default_title_min_chars() -> usize {
    30
}

const fn default_title_max_chars() -> usize {
    60
}

const fn default_meta_min_chars() -> usize {
    120
}

const fn default_meta_max_chars() -> usize {
    160
}

const fn default_keyword_density_min_pct() -> f64 {
    0.5
}

const fn default_keyword_density_max_pct() -> f64 {
    3.0
}

const fn default_optimal_sentence_words() -> usize {
    20
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_word_count: default_min_word_count(),
            max_word_count: default_max_word_count(),
            title_min_chars: default_title_min_chars(),
            title_max_chars: default_title_max_chars(),
            meta_min_chars: default_meta_min_chars(),
            meta_max_chars: default_meta_max_chars(),
            keyword_density_min_pct: default_keyword_density_min_pct(),
            keyword_density_max_pct: default_keyword_density_max_pct(),
            optimal_sentence_words: default_optimal_sentence_words(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Built-in gate set matching the default pipeline order.
fn default_gates() -> Vec<GateDefinition> {
    let content = ContentConfig::default();
    let pipeline = PipelineConfig::default();
    vec![
        GateDefinition {
            name: "draft_review".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinWordCount {
                    min: content.min_word_count,
                },
                GateCriterion::MaxWordCount {
                    max: content.max_word_count,
                },
                GateCriterion::RequiredKey {
                    key: "title".to_string(),
                },
            ],
        },
        GateDefinition {
            name: "editing_review".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::Fraction { threshold: 0.75 },
            criteria: vec![
                GateCriterion::ReadabilityMinimum { min: 55.0 },
                GateCriterion::KeywordDensityRange {
                    min_pct: content.keyword_density_min_pct,
                    max_pct: content.keyword_density_max_pct,
                },
                GateCriterion::MinWordCount {
                    min: content.min_word_count,
                },
                GateCriterion::MaxWordCount {
                    max: content.max_word_count,
                },
            ],
        },
        GateDefinition {
            name: "seo_review".to_string(),
            producer: "seo_metadata".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinSeoScore { min: 60.0 },
                GateCriterion::TitleLength {
                    min: content.title_min_chars,
                    max: content.title_max_chars,
                },
                GateCriterion::MetaDescriptionLength {
                    min: content.meta_min_chars,
                    max: content.meta_max_chars,
                },
            ],
        },
        GateDefinition {
            name: "content_validation".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinAverageConfidence {
                    min: pipeline.confidence_threshold,
                },
                GateCriterion::MaxFlaggedClaims { max: 0 },
            ],
        },
        GateDefinition {
            name: "publication".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::AllGatesPassed],
        },
    ]
}
