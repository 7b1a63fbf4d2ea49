//! Quality gate models.
//!
//! Gates are declarative checkpoints between stages. Each named gate owns a
//! criteria set and a threshold mode; evaluation itself lives in
//! `services::quality_gate` and is a pure function of the context snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How many criteria must hold for the gate to pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Every listed criterion must be individually satisfied.
    AllCriteria,
    /// The fraction of satisfied criteria must be at least `threshold`.
    Fraction { threshold: f64 },
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::AllCriteria
    }
}

/// One declarative gate criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateCriterion {
    MinWordCount { min: usize },
    MaxWordCount { max: usize },
    /// Keyword density across the focus keywords, in percent of total words.
    KeywordDensityRange { min_pct: f64, max_pct: f64 },
    /// Readability score floor (0-100, higher reads easier).
    ReadabilityMinimum { min: f64 },
    /// Overall SEO composite score floor (0-100).
    MinSeoScore { min: f64 },
    TitleLength { min: usize, max: usize },
    MetaDescriptionLength { min: usize, max: usize },
    /// Average claim confidence floor.
    MinAverageConfidence { min: f64 },
    /// Ceiling on claims flagged for review.
    MaxFlaggedClaims { max: usize },
    /// A payload key that must be present.
    RequiredKey { key: String },
    /// Every previously evaluated gate must have passed.
    AllGatesPassed,
}

impl GateCriterion {
    /// Stable criterion name used in `failed_criteria` listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinWordCount { .. } => "min_word_count",
            Self::MaxWordCount { .. } => "max_word_count",
            Self::KeywordDensityRange { .. } => "keyword_density_range",
            Self::ReadabilityMinimum { .. } => "readability_minimum",
            Self::MinSeoScore { .. } => "min_seo_score",
            Self::TitleLength { .. } => "title_length",
            Self::MetaDescriptionLength { .. } => "meta_description_length",
            Self::MinAverageConfidence { .. } => "min_average_confidence",
            Self::MaxFlaggedClaims { .. } => "max_flagged_claims",
            Self::RequiredKey { .. } => "required_key",
            Self::AllGatesPassed => "all_gates_passed",
        }
    }
}

/// Structured, machine-actionable guidance for a retried stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateFeedback {
    /// Criterion names the producing stage should focus on.
    pub focus_areas: Vec<String>,
    /// Concrete numeric/string targets keyed by criterion name.
    pub targets: Map<String, Value>,
}

impl GateFeedback {
    pub fn is_empty(&self) -> bool {
        self.focus_areas.is_empty() && self.targets.is_empty()
    }
}

/// Result of evaluating one gate against a context snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateResult {
    pub gate_name: String,
    pub passed: bool,
    /// Fraction of satisfied criteria.
    pub score: Option<f64>,
    /// Every unmet criterion by name. A fraction-mode gate can pass with
    /// some criteria still listed here.
    pub failed_criteria: Vec<String>,
    pub feedback: Option<GateFeedback>,
}

/// Declarative definition of a named gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDefinition {
    pub name: String,
    /// Stage that produced the content this gate judges; feedback retries
    /// re-invoke this stage, which is not always the stage just executed.
    pub producer: String,
    #[serde(default)]
    pub threshold: ThresholdMode,
    pub criteria: Vec<GateCriterion>,
}
