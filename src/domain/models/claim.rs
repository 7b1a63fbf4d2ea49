//! Factual claim models.
//!
//! Claims are discrete assertions extracted from a content body, each
//! carrying a validated confidence score and an SEO-value classification.

use serde::{Deserialize, Serialize};

/// Kind of an extracted assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Statistic,
    Fact,
    Prediction,
    Opinion,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistic => "statistic",
            Self::Fact => "fact",
            Self::Prediction => "prediction",
            Self::Opinion => "opinion",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "statistic" => Some(Self::Statistic),
            "fact" => Some(Self::Fact),
            "prediction" => Some(Self::Prediction),
            "opinion" => Some(Self::Opinion),
            _ => None,
        }
    }
}

/// SEO value classification for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoValue {
    High,
    Medium,
    Low,
}

impl SeoValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Qualitative plausibility label returned by the validation assessment.
///
/// The numeric mapping is strictly monotonic: each label maps to a lower
/// confidence than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLabel {
    Accurate,
    LikelyAccurate,
    Uncertain,
    LikelyInaccurate,
    Inaccurate,
}

impl ConfidenceLabel {
    /// All labels in decreasing order of confidence.
    pub const ORDERED: [Self; 5] = [
        Self::Accurate,
        Self::LikelyAccurate,
        Self::Uncertain,
        Self::LikelyInaccurate,
        Self::Inaccurate,
    ];

    /// Numeric confidence score for this label.
    pub fn score(&self) -> f64 {
        match self {
            Self::Accurate => 0.95,
            Self::LikelyAccurate => 0.8,
            Self::Uncertain => 0.5,
            Self::LikelyInaccurate => 0.25,
            Self::Inaccurate => 0.05,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACCURATE" => Some(Self::Accurate),
            "LIKELY_ACCURATE" => Some(Self::LikelyAccurate),
            "UNCERTAIN" => Some(Self::Uncertain),
            "LIKELY_INACCURATE" => Some(Self::LikelyInaccurate),
            "INACCURATE" => Some(Self::Inaccurate),
            _ => None,
        }
    }
}

/// A discrete factual assertion with its validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// The assertion as extracted (or a normalized paraphrase).
    pub text: String,
    pub kind: ClaimKind,
    /// Confidence in [0.0, 1.0] assigned by the validator.
    pub confidence_score: f64,
    pub seo_value: SeoValue,
    /// Pure function of `confidence_score` and the review threshold.
    pub needs_review: bool,
}

impl Claim {
    /// Build a claim, deriving `needs_review` from the threshold.
    pub fn new(
        text: impl Into<String>,
        kind: ClaimKind,
        confidence_score: f64,
        seo_value: SeoValue,
        review_threshold: f64,
    ) -> Self {
        let confidence_score = confidence_score.clamp(0.0, 1.0);
        Self {
            text: text.into(),
            kind,
            confidence_score,
            seo_value,
            needs_review: confidence_score < review_threshold,
        }
    }
}

/// Aggregate output of claim extraction and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub claims: Vec<Claim>,
    /// Mean confidence across all claims; 0.0 when there are none.
    pub average_confidence: f64,
    /// Count of claims with `needs_review` set.
    pub flagged_count: usize,
}

impl ValidationReport {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_claims(claims: Vec<Claim>) -> Self {
        let average_confidence = if claims.is_empty() {
            0.0
        } else {
            claims.iter().map(|c| c.confidence_score).sum::<f64>() / claims.len() as f64
        };
        let flagged_count = claims.iter().filter(|c| c.needs_review).count();
        Self {
            claims,
            average_confidence,
            flagged_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confidence_mapping_strictly_decreasing() {
        let scores: Vec<f64> = ConfidenceLabel::ORDERED.iter().map(|l| l.score()).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1], "expected {} > {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_label_round_trip() {
        for label in ConfidenceLabel::ORDERED {
            let json = serde_json::to_string(&label).unwrap();
            let back: ConfidenceLabel = serde_json::from_str(&json).unwrap();
            assert_eq!(label, back);
        }
        assert_eq!(
            ConfidenceLabel::from_str("likely_accurate"),
            Some(ConfidenceLabel::LikelyAccurate)
        );
    }

    #[test]
    fn test_needs_review_derived_from_threshold() {
        let c = Claim::new("x", ClaimKind::Fact, 0.69, SeoValue::Medium, 0.7);
        assert!(c.needs_review);
        let c = Claim::new("x", ClaimKind::Fact, 0.7, SeoValue::Medium, 0.7);
        assert!(!c.needs_review);
    }

    #[test]
    fn test_report_aggregates() {
        let claims = vec![
            Claim::new("a", ClaimKind::Statistic, 0.9, SeoValue::High, 0.7),
            Claim::new("b", ClaimKind::Fact, 0.5, SeoValue::Low, 0.7),
            Claim::new("c", ClaimKind::Opinion, 0.1, SeoValue::Low, 0.7),
        ];
        let report = ValidationReport::from_claims(claims);
        assert_eq!(report.flagged_count, 2);
        assert!((report.average_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::from_claims(vec![]);
        assert!((report.average_confidence - 0.0).abs() < f64::EPSILON);
        assert_eq!(report.flagged_count, 0);
    }

    proptest! {
        #[test]
        fn prop_needs_review_matches_threshold(score in 0.0f64..=1.0, threshold in 0.0f64..=1.0) {
            let claim = Claim::new("p", ClaimKind::Fact, score, SeoValue::Medium, threshold);
            prop_assert_eq!(claim.needs_review, claim.confidence_score < threshold);
        }

        #[test]
        fn prop_confidence_always_clamped(score in -2.0f64..=3.0) {
            let claim = Claim::new("p", ClaimKind::Fact, score, SeoValue::Medium, 0.7);
            prop_assert!((0.0..=1.0).contains(&claim.confidence_score));
        }
    }
}
