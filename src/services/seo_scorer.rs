//! SEO composite scorer.
//!
//! All sub-scores are deterministic, language-agnostic text statistics with
//! no external calls. Identical inputs always produce identical scores.

use serde::{Deserialize, Serialize};

use crate::domain::models::ContentConfig;

/// Fixed sub-score weights; must sum to 1.0.
pub const WEIGHT_STRUCTURE: f64 = 0.20;
pub const WEIGHT_KEYWORDS: f64 = 0.25;
pub const WEIGHT_READABILITY: f64 = 0.20;
pub const WEIGHT_METADATA: f64 = 0.15;
pub const WEIGHT_SEMANTIC: f64 = 0.20;

/// Letter grade for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeoGrade {
    A,
    B,
    C,
    D,
    F,
}

impl SeoGrade {
    /// Exact-boundary grade mapping: >=90 A, >=80 B, >=70 C, >=60 D, else F.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 80.0 {
            Self::B
        } else if score >= 70.0 {
            Self::C
        } else if score >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

/// The five named sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeoSubScores {
    pub structure: f64,
    pub keywords: f64,
    pub readability: f64,
    pub metadata: f64,
    pub semantic: f64,
}

/// Full scoring result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoReport {
    pub sub_scores: SeoSubScores,
    /// Weighted composite in [0, 100].
    pub overall: f64,
    pub grade: SeoGrade,
}

/// Everything the scorer looks at for one piece of content.
#[derive(Debug, Clone, Copy)]
pub struct SeoInputs<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub meta_description: Option<&'a str>,
    pub tags: &'a [String],
    pub keywords: &'a [String],
}

/// Deterministic SEO scorer parameterized by the configured content windows.
#[derive(Debug, Clone)]
pub struct SeoScorer {
    content: ContentConfig,
}

impl SeoScorer {
    pub fn new(content: ContentConfig) -> Self {
        Self { content }
    }

    /// Compute all sub-scores and the weighted composite.
    pub fn score(&self, inputs: &SeoInputs<'_>) -> SeoReport {
        let sub_scores = SeoSubScores {
            structure: self.structure_score(inputs.body),
            keywords: self.keywords_score(inputs.title, inputs.body, inputs.keywords),
            readability: self.readability_score(inputs.body),
            metadata: self.metadata_score(inputs.title, inputs.meta_description, inputs.tags),
            semantic: Self::semantic_score(inputs.title, inputs.body),
        };
        let overall = WEIGHT_STRUCTURE * sub_scores.structure
            + WEIGHT_KEYWORDS * sub_scores.keywords
            + WEIGHT_READABILITY * sub_scores.readability
            + WEIGHT_METADATA * sub_scores.metadata
            + WEIGHT_SEMANTIC * sub_scores.semantic;
        SeoReport {
            sub_scores,
            overall,
            grade: SeoGrade::from_score(overall),
        }
    }

    /// Headings, paragraph count, and paragraph length against the windows.
    fn structure_score(&self, body: &str) -> f64 {
        let paragraphs: Vec<&str> = body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let has_headings = body.lines().any(|l| l.trim_start().starts_with('#'));
        let has_list = body
            .lines()
            .any(|l| l.trim_start().starts_with("- ") || l.trim_start().starts_with("* "));
        let enough_paragraphs = paragraphs.len() >= 3;
        let digestible = !paragraphs.is_empty()
            && paragraphs.iter().all(|p| word_count(p) <= 150);

        let mut score = 0.0;
        if has_headings {
            score += 30.0;
        }
        if enough_paragraphs {
            score += 30.0;
        }
        if digestible {
            score += 25.0;
        }
        if has_list {
            score += 15.0;
        }
        score
    }

    /// Density window plus title/lead placement of the focus keywords.
    fn keywords_score(&self, title: &str, body: &str, keywords: &[String]) -> f64 {
        if keywords.is_empty() {
            // Nothing to measure; neutral midpoint rather than a penalty.
            return 50.0;
        }

        let density = keyword_density(body, keywords);
        let in_window = density >= self.content.keyword_density_min_pct
            && density <= self.content.keyword_density_max_pct;
        let title_lower = title.to_lowercase();
        let in_title = keywords
            .iter()
            .any(|k| title_lower.contains(&k.to_lowercase()));
        let lead: String = body
            .split_whitespace()
            .take(100)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let in_lead = keywords.iter().any(|k| lead.contains(&k.to_lowercase()));

        let mut score = 0.0;
        if in_window {
            score += 60.0;
        } else if density > 0.0 {
            // Present but outside the window: half credit.
            score += 30.0;
        }
        if in_title {
            score += 25.0;
        }
        if in_lead {
            score += 15.0;
        }
        score
    }

    /// Sentence-length statistics against the configured optimum.
    ///
    /// Public because gate criteria check readability on its own.
    #[allow(clippy::cast_precision_loss)]
    pub fn readability_score(&self, body: &str) -> f64 {
        let sentences: Vec<&str> = body
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return 0.0;
        }

        let total_words: usize = sentences.iter().map(|s| word_count(s)).sum();
        let avg_sentence_words = total_words as f64 / sentences.len() as f64;
        let optimal = self.content.optimal_sentence_words as f64;
        let long_threshold = (optimal * 1.5).round() as usize;
        let long_ratio = sentences
            .iter()
            .filter(|s| word_count(s) > long_threshold)
            .count() as f64
            / sentences.len() as f64;
        let total_chars: usize = body.split_whitespace().map(str::len).sum();
        let avg_word_chars = if total_words == 0 {
            0.0
        } else {
            total_chars as f64 / total_words as f64
        };

        let excess = (avg_sentence_words - optimal).max(0.0);
        let score = 100.0 - excess * 3.0 - long_ratio * 30.0 - (avg_word_chars - 5.5).max(0.0) * 8.0;
        score.clamp(0.0, 100.0)
    }

    /// Title, meta-description, and tag-count windows.
    fn metadata_score(&self, title: &str, meta_description: Option<&str>, tags: &[String]) -> f64 {
        let mut score = 0.0;

        let title_len = title.chars().count();
        if (self.content.title_min_chars..=self.content.title_max_chars).contains(&title_len) {
            score += 40.0;
        } else if title_len > 0 {
            score += 20.0;
        }

        if let Some(meta) = meta_description {
            let meta_len = meta.chars().count();
            if (self.content.meta_min_chars..=self.content.meta_max_chars).contains(&meta_len) {
                score += 40.0;
            } else if meta_len > 0 {
                score += 20.0;
            }
        }

        if (3..=8).contains(&tags.len()) {
            score += 20.0;
        } else if !tags.is_empty() {
            score += 10.0;
        }

        score
    }

    /// Overlap between the title's content words and the body vocabulary.
    #[allow(clippy::cast_precision_loss)]
    fn semantic_score(title: &str, body: &str) -> f64 {
        let body_lower = body.to_lowercase();
        let content_words: Vec<String> = title
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| w.chars().count() > 3)
            .collect();
        if content_words.is_empty() {
            return 0.0;
        }
        let present = content_words
            .iter()
            .filter(|w| body_lower.contains(w.as_str()))
            .count();
        present as f64 / content_words.len() as f64 * 100.0
    }
}

/// Words in a text, whitespace-delimited.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Combined density of the focus keywords, in percent of total words.
#[allow(clippy::cast_precision_loss)]
pub fn keyword_density(body: &str, keywords: &[String]) -> f64 {
    let total_words = word_count(body);
    if total_words == 0 || keywords.is_empty() {
        return 0.0;
    }
    let body_lower = body.to_lowercase();
    let occurrences: usize = keywords
        .iter()
        .map(|k| {
            let k = k.to_lowercase();
            if k.is_empty() {
                0
            } else {
                body_lower.matches(&k).count()
            }
        })
        .sum();
    occurrences as f64 / total_words as f64 * 100.0
}

/// URL-friendly slug: lowercase, hyphenated, alphanumerics only,
/// word-boundary truncated at `max_length`.
pub fn slugify(text: &str, max_length: usize) -> String {
    let mut slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '-'
            }
        })
        .collect();
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let mut slug = slug.trim_matches('-').to_string();
    if slug.len() > max_length {
        slug.truncate(max_length);
        if let Some(idx) = slug.rfind('-') {
            if idx > 0 {
                slug.truncate(idx);
            }
        }
        slug = slug.trim_matches('-').to_string();
    }
    slug
}

/// First sentences of the body, truncated into the meta-description window.
pub fn meta_description_fallback(body: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for sentence in body.split_inclusive(['.', '!', '?']) {
        let candidate = sentence.trim().replace('\n', " ");
        if candidate.starts_with('#') {
            continue;
        }
        if out.chars().count() + candidate.chars().count() + 1 > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&candidate);
    }
    if out.is_empty() {
        out = body.chars().take(max_chars).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scorer() -> SeoScorer {
        SeoScorer::new(ContentConfig::default())
    }

    fn sample_inputs<'a>(
        tags: &'a [String],
        keywords: &'a [String],
    ) -> SeoInputs<'a> {
        SeoInputs {
            title: "Machine Learning Trends Shaping Modern Industry",
            body: "# Machine Learning Trends\n\nMachine learning is reshaping industry. \
                   Adoption grows every year. Teams report real gains.\n\n\
                   - Faster analysis\n- Better forecasts\n\n\
                   The trends point one way. Machine learning tools mature quickly. \
                   Industry adapts with them.",
            meta_description: Some(
                "A look at the machine learning trends reshaping modern industry, \
                 from adoption rates to the tooling that teams rely on every day.",
            ),
            tags,
            keywords,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_STRUCTURE
            + WEIGHT_KEYWORDS
            + WEIGHT_READABILITY
            + WEIGHT_METADATA
            + WEIGHT_SEMANTIC;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_is_pure() {
        let tags = vec!["ml".to_string(), "trends".to_string(), "industry".to_string()];
        let keywords = vec!["machine learning".to_string()];
        let inputs = sample_inputs(&tags, &keywords);
        let first = scorer().score(&inputs);
        let second = scorer().score(&inputs);
        assert_eq!(first.sub_scores, second.sub_scores);
        assert!((first.overall - second.overall).abs() < f64::EPSILON);
        assert_eq!(first.grade, second.grade);
    }

    #[test]
    fn test_grade_boundaries_inclusive() {
        assert_eq!(SeoGrade::from_score(90.0), SeoGrade::A);
        assert_eq!(SeoGrade::from_score(89.9), SeoGrade::B);
        assert_eq!(SeoGrade::from_score(80.0), SeoGrade::B);
        assert_eq!(SeoGrade::from_score(70.0), SeoGrade::C);
        assert_eq!(SeoGrade::from_score(60.0), SeoGrade::D);
        assert_eq!(SeoGrade::from_score(59.999), SeoGrade::F);
    }

    #[test]
    fn test_short_sentences_read_better_than_long() {
        let s = scorer();
        let short = "Tools mature fast. Teams adapt well. Gains are real. Costs keep falling.";
        let long = "Tools mature fast while teams adapt well and gains are real although \
                    costs keep falling and every department wants a piece of the action \
                    which complicates planning considerably across the whole organization \
                    for years on end without any clear resolution in sight for anyone";
        assert!(s.readability_score(short) > s.readability_score(long));
    }

    #[test]
    fn test_keyword_density_percentage() {
        let body = "rust is fast and rust is safe and that is why we like rust here";
        let keywords = vec!["rust".to_string()];
        let density = keyword_density(body, &keywords);
        // 3 occurrences of "rust" across 15 words
        assert!((density - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_keywords_score_neutral() {
        let tags: Vec<String> = vec![];
        let keywords: Vec<String> = vec![];
        let inputs = sample_inputs(&tags, &keywords);
        let report = scorer().score(&inputs);
        assert!((report.sub_scores.keywords - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_slugify_matches_expectations() {
        assert_eq!(slugify("Hello, World!", 60), "hello-world");
        assert_eq!(
            slugify("Rust & the Art   of Systems Programming", 60),
            "rust-the-art-of-systems-programming"
        );
        let long = slugify(
            "an extremely long title that should get truncated at a word boundary somewhere",
            30,
        );
        assert!(long.len() <= 30);
        assert!(!long.ends_with('-'));
    }

    #[test]
    fn test_meta_description_fallback_fits_window() {
        let body = "# Heading\n\nFirst sentence here. Second sentence follows on. \
                    Third sentence is a bit longer than the others and may not fit.";
        let meta = meta_description_fallback(body, 80);
        assert!(meta.chars().count() <= 80);
        assert!(meta.starts_with("First sentence"));
    }

    proptest! {
        #[test]
        fn prop_sub_scores_bounded(body in ".{0,400}") {
            let s = scorer();
            let tags: Vec<String> = vec![];
            let keywords = vec!["topic".to_string()];
            let inputs = SeoInputs {
                title: "A Title",
                body: &body,
                meta_description: None,
                tags: &tags,
                keywords: &keywords,
            };
            let report = s.score(&inputs);
            for sub in [
                report.sub_scores.structure,
                report.sub_scores.keywords,
                report.sub_scores.readability,
                report.sub_scores.metadata,
                report.sub_scores.semantic,
            ] {
                prop_assert!((0.0..=100.0).contains(&sub));
            }
            prop_assert!((0.0..=100.0).contains(&report.overall));
        }

        #[test]
        fn prop_slug_is_url_safe(text in ".{0,120}") {
            let slug = slugify(&text, 60);
            prop_assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(slug.len() <= 60);
        }
    }
}
