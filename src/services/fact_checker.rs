//! Claim extraction and validation.
//!
//! The fact checker pulls discrete assertions out of a content body through
//! the generation service, then validates each one individually. A claim is
//! never dropped: if its validation cannot complete, it survives with zero
//! confidence and a review flag.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::models::{Claim, ClaimKind, ConfidenceLabel, SeoValue, ValidationReport};
use crate::domain::ports::{CompletionRequest, GenerationError, GenerationService, ResponseFormat};
use crate::services::retry::{RetryError, RetryPolicy};

/// Sentences carrying a number plus one of these units are treated as
/// statistic claims when structured extraction is unavailable.
static STATISTIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(%|percent|million|billion|thousand|users|people|times)")
        .expect("statistic pattern compiles")
});

const EXTRACT_INSTRUCTIONS: &str = "You are a meticulous fact checker. Extract every discrete \
     factual assertion from the content. For each, return its text and its kind: one of \
     statistic, fact, prediction, or opinion.";

const VALIDATE_INSTRUCTIONS: &str = "You are a meticulous fact checker. Assess the plausibility \
     of the claim. Return a label (one of ACCURATE, LIKELY_ACCURATE, UNCERTAIN, \
     LIKELY_INACCURATE, INACCURATE) and its seo_value (one of high, medium, low).";

#[derive(Debug, Deserialize)]
struct ExtractedClaim {
    text: String,
    #[serde(default)]
    kind: Option<String>,
}

/// Report plus the non-fatal degradations observed while producing it.
#[derive(Debug)]
pub struct FactCheckOutcome {
    pub report: ValidationReport,
    pub warnings: Vec<String>,
}

/// Extracts and validates factual claims via the generation service.
pub struct FactChecker {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    confidence_threshold: f64,
}

impl FactChecker {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            generation,
            retry,
            confidence_threshold,
        }
    }

    /// Extract claims from `content` and validate each one.
    pub async fn check(&self, content: &str) -> FactCheckOutcome {
        let mut warnings = Vec::new();

        let extracted = match self.extract_claims(content).await {
            Ok(claims) => claims,
            Err(err) => {
                let err = err.into_source();
                warn!(error = %err, "claim extraction failed, using statistic fallback");
                warnings.push(format!(
                    "claim extraction failed ({err}); statistic pattern fallback used"
                ));
                fallback_extract(content)
            }
        };
        debug!(claims = extracted.len(), "claims extracted");

        let mut claims = Vec::with_capacity(extracted.len());
        for (text, kind) in extracted {
            match self.validate_claim(&text).await {
                Ok((label, seo_value)) => {
                    claims.push(Claim::new(
                        text,
                        kind,
                        label.score(),
                        seo_value,
                        self.confidence_threshold,
                    ));
                }
                Err(err) => {
                    let err = err.into_source();
                    warn!(claim = %text, error = %err, "claim validation failed");
                    warnings.push(format!("validation failed for claim '{text}': {err}"));
                    // Unvalidated claims stay in the report at zero confidence.
                    claims.push(Claim::new(
                        text,
                        kind,
                        0.0,
                        SeoValue::Low,
                        self.confidence_threshold,
                    ));
                }
            }
        }

        FactCheckOutcome {
            report: ValidationReport::from_claims(claims),
            warnings,
        }
    }

    async fn extract_claims(
        &self,
        content: &str,
    ) -> Result<Vec<(String, ClaimKind)>, RetryError<GenerationError>> {
        let outcome = self
            .retry
            .execute(|| {
                self.generation.complete(CompletionRequest::new(
                    EXTRACT_INSTRUCTIONS,
                    content,
                    ResponseFormat::JsonArray {
                        schema_name: "claims",
                        required_keys: &["text", "kind"],
                    },
                ))
            })
            .await?;

        let items: Vec<ExtractedClaim> =
            serde_json::from_value(outcome.value).map_err(|e| {
                RetryError::Fatal(GenerationError::Malformed {
                    schema: "claims".to_string(),
                    reason: e.to_string(),
                })
            })?;
        Ok(items
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| {
                let kind = c
                    .kind
                    .as_deref()
                    .and_then(ClaimKind::from_str)
                    .unwrap_or(ClaimKind::Fact);
                (c.text, kind)
            })
            .collect())
    }

    async fn validate_claim(
        &self,
        text: &str,
    ) -> Result<(ConfidenceLabel, SeoValue), RetryError<GenerationError>> {
        let outcome = self
            .retry
            .execute(|| {
                self.generation.complete(CompletionRequest::new(
                    VALIDATE_INSTRUCTIONS,
                    text,
                    ResponseFormat::JsonObject {
                        schema_name: "claim_validation",
                        required_keys: &["label", "seo_value"],
                    },
                ))
            })
            .await?;

        let label = field_str(&outcome.value, "label")
            .and_then(ConfidenceLabel::from_str)
            .ok_or_else(|| malformed("claim_validation", "unrecognized label"))?;
        let seo_value = field_str(&outcome.value, "seo_value")
            .and_then(SeoValue::from_str)
            .ok_or_else(|| malformed("claim_validation", "unrecognized seo_value"))?;
        Ok((label, seo_value))
    }
}

fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn malformed(schema: &str, reason: &str) -> RetryError<GenerationError> {
    RetryError::Fatal(GenerationError::Malformed {
        schema: schema.to_string(),
        reason: reason.to_string(),
    })
}

/// Pattern-based extraction: every sentence with a number-plus-unit match
/// becomes a statistic claim.
fn fallback_extract(content: &str) -> Vec<(String, ClaimKind)> {
    content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && STATISTIC_PATTERN.is_match(s))
        .map(|s| (s.replace('\n', " "), ClaimKind::Statistic))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Generation stub that replays a scripted response sequence.
    struct ScriptedGeneration {
        responses: Mutex<VecDeque<Result<Value, GenerationError>>>,
    }

    impl ScriptedGeneration {
        fn new(responses: Vec<Result<Value, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedGeneration {
        async fn complete(&self, _request: CompletionRequest) -> Result<Value, GenerationError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::Unavailable("script exhausted".into())))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, 0, 2.0, 0)
    }

    #[tokio::test]
    async fn test_extracts_and_validates_all_claims() {
        let generation = ScriptedGeneration::new(vec![
            Ok(json!([
                { "text": "Adoption grew 40% in 2025", "kind": "statistic" },
                { "text": "The framework is open source", "kind": "fact" },
            ])),
            Ok(json!({ "label": "ACCURATE", "seo_value": "high" })),
            Ok(json!({ "label": "UNCERTAIN", "seo_value": "low" })),
        ]);
        let checker = FactChecker::new(generation, fast_retry(), 0.7);

        let outcome = checker.check("some article body").await;
        assert!(outcome.warnings.is_empty());
        let report = outcome.report;
        assert_eq!(report.claims.len(), 2);
        assert!((report.claims[0].confidence_score - 0.95).abs() < 1e-9);
        assert!(!report.claims[0].needs_review);
        assert!((report.claims[1].confidence_score - 0.5).abs() < 1e-9);
        assert!(report.claims[1].needs_review);
        assert_eq!(report.flagged_count, 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_falls_back_to_statistic_pattern() {
        // Extraction fails fatally; the single fallback claim then validates.
        let generation = ScriptedGeneration::new(vec![
            Err(GenerationError::Auth("bad key".into())),
            Ok(json!({ "label": "LIKELY_ACCURATE", "seo_value": "medium" })),
        ]);
        let checker = FactChecker::new(generation, fast_retry(), 0.7);

        let body = "Revenue rose 12% this quarter. The team shipped a redesign.";
        let outcome = checker.check(body).await;
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.report.claims.len(), 1);
        assert_eq!(outcome.report.claims[0].kind, ClaimKind::Statistic);
        assert!(outcome.report.claims[0].text.contains("12%"));
    }

    #[tokio::test]
    async fn test_failed_validation_keeps_claim_at_zero_confidence() {
        let generation = ScriptedGeneration::new(vec![
            Ok(json!([{ "text": "A bold assertion", "kind": "fact" }])),
            Err(GenerationError::Timeout),
            Err(GenerationError::Timeout),
            Err(GenerationError::Timeout),
        ]);
        let checker = FactChecker::new(generation, fast_retry(), 0.7);

        let outcome = checker.check("body").await;
        assert_eq!(outcome.report.claims.len(), 1);
        let claim = &outcome.report.claims[0];
        assert!((claim.confidence_score - 0.0).abs() < f64::EPSILON);
        assert!(claim.needs_review);
        assert_eq!(outcome.report.flagged_count, 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_no_claims_produces_empty_report() {
        let generation = ScriptedGeneration::new(vec![Ok(json!([]))]);
        let checker = FactChecker::new(generation, fast_retry(), 0.7);

        let outcome = checker.check("an entirely uncontroversial body").await;
        assert!(outcome.report.is_empty());
        assert!((outcome.report.average_confidence - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_matches_numeric_units() {
        let claims = fallback_extract(
            "Over 3.5 million users joined. The sky is blue. Growth was 7 times faster!",
        );
        let texts: Vec<&str> = claims.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Over 3.5 million users joined", "Growth was 7 times faster"]
        );
    }

    #[test]
    fn test_fallback_unit_matching_ignores_case() {
        let claims =
            fallback_extract("Churn dropped 12 Percent. We now serve 5 Million Users worldwide.");
        let texts: Vec<&str> = claims.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Churn dropped 12 Percent", "We now serve 5 Million Users worldwide"]
        );
    }
}
