//! Quality gate evaluation.
//!
//! A gate is a pure function of the context snapshot: same context, same
//! criteria, same verdict. Missing or malformed payload data fails the
//! criterion that needs it rather than erroring the run.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::models::{
    ContentConfig, Context, GateCriterion, GateDefinition, GateFeedback, QualityGateResult,
    ThresholdMode,
};
use crate::services::seo_scorer::{keyword_density, word_count, SeoScorer};

/// Evaluates gate definitions against context snapshots.
#[derive(Debug, Clone)]
pub struct GateEvaluator {
    scorer: SeoScorer,
}

struct CriterionVerdict {
    satisfied: bool,
    /// Concrete target for the producing stage, present only on failure.
    target: Option<Value>,
}

impl CriterionVerdict {
    fn pass() -> Self {
        Self {
            satisfied: true,
            target: None,
        }
    }

    fn fail(target: Value) -> Self {
        Self {
            satisfied: false,
            target: Some(target),
        }
    }
}

impl GateEvaluator {
    pub fn new(content: ContentConfig) -> Self {
        Self {
            scorer: SeoScorer::new(content),
        }
    }

    /// Evaluate one gate. Never errs: absent data is a failed criterion.
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&self, definition: &GateDefinition, context: &Context) -> QualityGateResult {
        let mut failed_criteria = Vec::new();
        let mut targets = Map::new();
        let mut satisfied = 0usize;

        for criterion in &definition.criteria {
            let verdict = self.check(criterion, definition, context);
            if verdict.satisfied {
                satisfied += 1;
            } else {
                failed_criteria.push(criterion.name().to_string());
                if let Some(target) = verdict.target {
                    targets.insert(criterion.name().to_string(), target);
                }
            }
        }

        let total = definition.criteria.len();
        let score = if total == 0 {
            1.0
        } else {
            satisfied as f64 / total as f64
        };
        let passed = match definition.threshold {
            ThresholdMode::AllCriteria => failed_criteria.is_empty(),
            ThresholdMode::Fraction { threshold } => score >= threshold,
        };

        debug!(
            gate = %definition.name,
            passed,
            score,
            failed = failed_criteria.len(),
            "gate evaluated"
        );

        let feedback = if passed {
            None
        } else {
            Some(GateFeedback {
                focus_areas: failed_criteria.clone(),
                targets,
            })
        };

        QualityGateResult {
            gate_name: definition.name.clone(),
            passed,
            score: Some(score),
            failed_criteria,
            feedback,
        }
    }

    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    fn check(
        &self,
        criterion: &GateCriterion,
        definition: &GateDefinition,
        context: &Context,
    ) -> CriterionVerdict {
        match criterion {
            GateCriterion::MinWordCount { min } => match body_text(context) {
                Some(body) => {
                    let actual = word_count(body);
                    if actual >= *min {
                        CriterionVerdict::pass()
                    } else {
                        CriterionVerdict::fail(json!({ "min": min, "actual": actual }))
                    }
                }
                None => CriterionVerdict::fail(json!({ "min": min, "actual": 0 })),
            },
            GateCriterion::MaxWordCount { max } => match body_text(context) {
                Some(body) => {
                    let actual = word_count(body);
                    if actual <= *max {
                        CriterionVerdict::pass()
                    } else {
                        CriterionVerdict::fail(json!({ "max": max, "actual": actual }))
                    }
                }
                None => CriterionVerdict::fail(json!({ "max": max, "actual": 0 })),
            },
            GateCriterion::KeywordDensityRange { min_pct, max_pct } => {
                let keywords = string_list(context, "keywords");
                match body_text(context) {
                    Some(body) if !keywords.is_empty() => {
                        let actual = keyword_density(body, &keywords);
                        if actual >= *min_pct && actual <= *max_pct {
                            CriterionVerdict::pass()
                        } else {
                            CriterionVerdict::fail(json!({
                                "min_pct": min_pct,
                                "max_pct": max_pct,
                                "actual_pct": actual,
                            }))
                        }
                    }
                    _ => CriterionVerdict::fail(json!({
                        "min_pct": min_pct,
                        "max_pct": max_pct,
                        "actual_pct": 0.0,
                    })),
                }
            }
            GateCriterion::ReadabilityMinimum { min } => match body_text(context) {
                Some(body) => {
                    let actual = self.scorer.readability_score(body);
                    if actual >= *min {
                        CriterionVerdict::pass()
                    } else {
                        CriterionVerdict::fail(json!({ "min": min, "actual": actual }))
                    }
                }
                None => CriterionVerdict::fail(json!({ "min": min, "actual": 0.0 })),
            },
            GateCriterion::MinSeoScore { min } => {
                let actual = context
                    .get("seo_report")
                    .and_then(|v| v.get("overall"))
                    .and_then(Value::as_f64);
                match actual {
                    Some(overall) if overall >= *min => CriterionVerdict::pass(),
                    other => CriterionVerdict::fail(json!({
                        "min": min,
                        "actual": other.unwrap_or(0.0),
                    })),
                }
            }
            GateCriterion::TitleLength { min, max } => {
                length_window(context, "title", *min, *max)
            }
            GateCriterion::MetaDescriptionLength { min, max } => {
                length_window(context, "meta_description", *min, *max)
            }
            GateCriterion::MinAverageConfidence { min } => {
                let actual = context
                    .get("fact_check_report")
                    .and_then(|v| v.get("average_confidence"))
                    .and_then(Value::as_f64);
                match actual {
                    Some(avg) if avg >= *min => CriterionVerdict::pass(),
                    other => CriterionVerdict::fail(json!({
                        "min": min,
                        "actual": other.unwrap_or(0.0),
                    })),
                }
            }
            GateCriterion::MaxFlaggedClaims { max } => {
                let actual = context
                    .get("fact_check_report")
                    .and_then(|v| v.get("flagged_count"))
                    .and_then(Value::as_u64);
                match actual {
                    Some(flagged) if flagged as usize <= *max => CriterionVerdict::pass(),
                    Some(flagged) => {
                        CriterionVerdict::fail(json!({ "max": max, "actual": flagged }))
                    }
                    // No report yet means nothing was validated.
                    None => CriterionVerdict::fail(json!({ "max": max, "actual": null })),
                }
            }
            GateCriterion::RequiredKey { key } => {
                if context.contains_key(key) {
                    CriterionVerdict::pass()
                } else {
                    CriterionVerdict::fail(json!({ "key": key }))
                }
            }
            GateCriterion::AllGatesPassed => {
                let failed_gates: Vec<&str> = context
                    .quality_gate_results
                    .values()
                    .filter(|r| r.gate_name != definition.name && !r.passed)
                    .map(|r| r.gate_name.as_str())
                    .collect();
                let prior_gates = context
                    .quality_gate_results
                    .keys()
                    .filter(|name| *name != &definition.name)
                    .count();
                if prior_gates > 0 && failed_gates.is_empty() {
                    CriterionVerdict::pass()
                } else {
                    CriterionVerdict::fail(json!({ "failed_gates": failed_gates }))
                }
            }
        }
    }
}

/// The content under judgment: the edited body when it exists, else the draft.
fn body_text(context: &Context) -> Option<&str> {
    context
        .get("edited_content")
        .or_else(|| context.get("draft_content"))
        .and_then(Value::as_str)
}

fn string_list(context: &Context, key: &str) -> Vec<String> {
    context
        .require_as::<Vec<String>>(key)
        .unwrap_or_default()
}

fn length_window(context: &Context, key: &str, min: usize, max: usize) -> CriterionVerdict {
    let actual = context
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.chars().count());
    match actual {
        Some(len) if (min..=max).contains(&len) => CriterionVerdict::pass(),
        other => CriterionVerdict::fail(json!({
            "min": min,
            "max": max,
            "actual": other.unwrap_or(0),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::QualityGateResult;
    use serde_json::json;

    fn evaluator() -> GateEvaluator {
        GateEvaluator::new(ContentConfig::default())
    }

    fn context_with_body(words: usize) -> Context {
        let mut ctx = Context::new();
        let body = vec!["word"; words].join(" ");
        ctx.insert("editing", "edited_content", json!(body)).unwrap();
        ctx
    }

    #[test]
    fn test_all_criteria_gate_passes_when_every_criterion_holds() {
        let definition = GateDefinition {
            name: "draft_review".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinWordCount { min: 10 },
                GateCriterion::MaxWordCount { max: 100 },
            ],
        };
        let result = evaluator().evaluate(&definition, &context_with_body(50));
        assert!(result.passed);
        assert_eq!(result.score, Some(1.0));
        assert!(result.failed_criteria.is_empty());
        assert!(result.feedback.is_none());
    }

    #[test]
    fn test_all_criteria_gate_fails_on_single_miss() {
        let definition = GateDefinition {
            name: "draft_review".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinWordCount { min: 10 },
                GateCriterion::MaxWordCount { max: 20 },
            ],
        };
        let result = evaluator().evaluate(&definition, &context_with_body(50));
        assert!(!result.passed);
        assert_eq!(result.failed_criteria, vec!["max_word_count"]);
        let feedback = result.feedback.unwrap();
        assert_eq!(feedback.focus_areas, vec!["max_word_count"]);
        assert_eq!(
            feedback.targets.get("max_word_count"),
            Some(&json!({ "max": 20, "actual": 50 }))
        );
    }

    #[test]
    fn test_fraction_gate_passes_above_threshold() {
        let definition = GateDefinition {
            name: "editing_review".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::Fraction { threshold: 0.5 },
            criteria: vec![
                GateCriterion::MinWordCount { min: 10 },
                GateCriterion::MaxWordCount { max: 20 },
            ],
        };
        let result = evaluator().evaluate(&definition, &context_with_body(50));
        // 1 of 2 satisfied, exactly at the threshold.
        assert!(result.passed);
        assert_eq!(result.score, Some(0.5));
        assert_eq!(result.failed_criteria, vec!["max_word_count"]);
        assert!(result.feedback.is_none());
    }

    #[test]
    fn test_missing_payload_fails_criterion_not_run() {
        let definition = GateDefinition {
            name: "seo_review".to_string(),
            producer: "seo_metadata".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::TitleLength { min: 30, max: 60 }],
        };
        let result = evaluator().evaluate(&definition, &Context::new());
        assert!(!result.passed);
        assert_eq!(result.failed_criteria, vec!["title_length"]);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let definition = GateDefinition {
            name: "draft_review".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::MinWordCount { min: 10 }],
        };
        let ctx = context_with_body(5);
        let first = evaluator().evaluate(&definition, &ctx);
        let second = evaluator().evaluate(&definition, &ctx);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.score, second.score);
        assert_eq!(first.failed_criteria, second.failed_criteria);
    }

    #[test]
    fn test_all_gates_passed_requires_prior_results() {
        let definition = GateDefinition {
            name: "publication".to_string(),
            producer: "editing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![GateCriterion::AllGatesPassed],
        };

        // No prior gates: must not vacuously pass.
        let result = evaluator().evaluate(&definition, &Context::new());
        assert!(!result.passed);

        let mut ctx = Context::new();
        ctx.record_gate(QualityGateResult {
            gate_name: "draft_review".to_string(),
            passed: true,
            score: Some(1.0),
            failed_criteria: vec![],
            feedback: None,
        });
        let result = evaluator().evaluate(&definition, &ctx);
        assert!(result.passed);

        ctx.record_gate(QualityGateResult {
            gate_name: "content_validation".to_string(),
            passed: false,
            score: Some(0.5),
            failed_criteria: vec!["min_average_confidence".to_string()],
            feedback: None,
        });
        let result = evaluator().evaluate(&definition, &ctx);
        assert!(!result.passed);
        let feedback = result.feedback.unwrap();
        assert_eq!(
            feedback.targets.get("all_gates_passed"),
            Some(&json!({ "failed_gates": ["content_validation"] }))
        );
    }

    #[test]
    fn test_claim_criteria_read_fact_check_report() {
        let mut ctx = Context::new();
        ctx.insert(
            "fact_check",
            "fact_check_report",
            json!({ "average_confidence": 0.62, "flagged_count": 2, "claims": [] }),
        )
        .unwrap();
        let definition = GateDefinition {
            name: "content_validation".to_string(),
            producer: "writing".to_string(),
            threshold: ThresholdMode::AllCriteria,
            criteria: vec![
                GateCriterion::MinAverageConfidence { min: 0.7 },
                GateCriterion::MaxFlaggedClaims { max: 0 },
            ],
        };
        let result = evaluator().evaluate(&definition, &ctx);
        assert!(!result.passed);
        assert_eq!(
            result.failed_criteria,
            vec!["min_average_confidence", "max_flagged_claims"]
        );
    }
}
