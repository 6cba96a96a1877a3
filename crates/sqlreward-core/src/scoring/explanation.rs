//! Explanation-quality scoring.

use serde::Deserialize;

/// What a good explanation is expected to contain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Markers that must all appear for the structure credit.
    pub markers: Vec<String>,
    /// SQL keywords checked for coverage.
    pub keywords: Vec<String>,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            markers: vec!["<think>".into(), "<answer>".into()],
            keywords: ["SELECT", "FROM", "WHERE", "JOIN"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExplanationConfig {
    /// Replaces the structure markers.
    #[must_use]
    pub fn markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the coverage keywords.
    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Inputs to explanation scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationInput<'a> {
    /// The explanation text.
    pub text: &'a str,
    /// The candidate SQL, if one was extracted.
    pub candidate_sql: Option<&'a str>,
    /// The reference SQL.
    pub reference_sql: &'a str,
    /// `;`-separated hints supplied with the question.
    pub external_knowledge: Option<&'a str>,
    /// Whether the candidate was judged equivalent.
    pub correct: bool,
}

/// Scores an explanation on four equally weighted criteria, each worth a
/// quarter of `max`:
///
/// - every structure marker is present;
/// - keyword coverage: the share of keywords used by the candidate SQL that
///   the explanation also mentions;
/// - at least one external-knowledge hint is quoted;
/// - for a wrong answer, the reference SQL is quoted.
///
/// Matching is by substring; keyword matching ignores case.
#[must_use]
pub fn score_explanation(config: &ExplanationConfig, input: &ExplanationInput<'_>, max: f64) -> f64 {
    if input.text.is_empty() || max <= 0.0 {
        return 0.0;
    }
    let quarter = max / 4.0;
    let mut score = 0.0;

    if !config.markers.is_empty() && config.markers.iter().all(|m| input.text.contains(m.as_str())) {
        score += quarter;
    }

    if !config.keywords.is_empty() {
        let sql = input.candidate_sql.unwrap_or_default().to_ascii_uppercase();
        let text = input.text.to_ascii_lowercase();
        let found = config
            .keywords
            .iter()
            .filter(|k| {
                sql.contains(&k.to_ascii_uppercase()) && text.contains(&k.to_ascii_lowercase())
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let coverage = found as f64 / config.keywords.len() as f64;
        score += quarter * coverage;
    }

    let cites_knowledge = input.external_knowledge.is_some_and(|knowledge| {
        knowledge
            .split(';')
            .map(str::trim)
            .any(|hint| !hint.is_empty() && input.text.contains(hint))
    });
    if cites_knowledge {
        score += quarter;
    }

    if !input.correct && !input.reference_sql.is_empty() && input.text.contains(input.reference_sql) {
        score += quarter;
    }

    score.clamp(0.0, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> ExplanationInput<'_> {
        ExplanationInput {
            text,
            candidate_sql: Some("SELECT a FROM t JOIN u ON t.id = u.id"),
            reference_sql: "SELECT a FROM t",
            external_knowledge: None,
            correct: true,
        }
    }

    #[test]
    fn test_empty_explanation_scores_zero() {
        assert!(score_explanation(&ExplanationConfig::default(), &input(""), 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_markers_and_keywords() {
        let config = ExplanationConfig::default();
        let text = "<think>select from the join</think><answer>...</answer>";
        // Markers: 0.5; keywords SELECT, FROM and JOIN of four: 0.375.
        let score = score_explanation(&config, &input(text), 2.0);
        assert!((score - 0.875).abs() < 1e-9, "{score}");
    }

    #[test]
    fn test_keywords_must_be_in_both() {
        let config = ExplanationConfig::default();
        let mut data = input("where is it");
        data.candidate_sql = Some("SELECT a FROM t");
        assert!(score_explanation(&config, &data, 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_external_knowledge_and_reference_citation() {
        let config = ExplanationConfig::default();
        let mut data = input("high complexity means > 5; see SELECT a FROM t");
        data.candidate_sql = None;
        data.external_knowledge = Some("unused hint; high complexity means > 5;");
        data.correct = false;
        let score = score_explanation(&config, &data, 2.0);
        assert!((score - 1.0).abs() < 1e-9, "{score}");

        data.correct = true;
        let score = score_explanation(&config, &data, 2.0);
        assert!((score - 0.5).abs() < 1e-9, "{score}");
    }

    #[test]
    fn test_bounded_by_max() {
        let config = ExplanationConfig::default();
        let mut data = input("<think>select from where join SELECT a FROM t hint</think><answer>");
        data.candidate_sql = Some("SELECT a FROM t JOIN u WHERE x");
        data.external_knowledge = Some("hint");
        data.correct = false;
        let score = score_explanation(&config, &data, 0.5);
        assert!((score - 0.5).abs() < 1e-9, "{score}");
    }
}
