//! End-to-end evaluation of one candidate answer.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{self, ComparisonOutcome};
use crate::dialect::{Dialect, GenericDialect};
use crate::execution::{Connection, ExecutionConfig};
use crate::metadata::QueryMetadata;
use crate::parser::{parse, ParserConfig};
use crate::schema::Schema;
use crate::scoring::{
    score_explanation, ExplanationConfig, ExplanationInput, Gate, LengthInput, ScoreBreakdown,
    ScoreCard, ScoringConfig,
};
use crate::validate::{SchemaValidator, ValidationResult, ValidatorConfig};

/// Settings of every stage, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Statement allowlist.
    pub parser: ParserConfig,
    /// Schema validation settings.
    pub validator: ValidatorConfig,
    /// Explanation scoring criteria.
    pub explanation: ExplanationConfig,
    /// Weights, caps and bounds.
    pub scoring: ScoringConfig,
    /// Result comparison settings.
    pub execution: ExecutionConfig,
}

impl EvaluatorConfig {
    /// Sets the parser settings.
    #[must_use]
    pub fn parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Sets the validator settings.
    #[must_use]
    pub const fn validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the explanation criteria.
    #[must_use]
    pub fn explanation(mut self, explanation: ExplanationConfig) -> Self {
        self.explanation = explanation;
        self
    }

    /// Sets the scoring configuration.
    #[must_use]
    pub fn scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Sets the result comparison settings.
    #[must_use]
    pub const fn execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// The answer being scored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Candidate<'a> {
    /// The extracted SQL; `None` when extraction failed.
    pub sql: Option<&'a str>,
    /// Whether the answer had the expected overall format.
    pub well_formed: bool,
    /// Free-text reasoning accompanying the SQL.
    pub explanation: Option<&'a str>,
    /// Section lengths of the response, for length credit.
    pub lengths: Option<LengthInput>,
}

impl<'a> Candidate<'a> {
    /// A well-formed candidate with SQL and no explanation.
    #[must_use]
    pub const fn sql(sql: &'a str) -> Self {
        Self {
            sql: Some(sql),
            well_formed: true,
            explanation: None,
            lengths: None,
        }
    }

    /// Sets the explanation.
    #[must_use]
    pub const fn explanation(mut self, explanation: &'a str) -> Self {
        self.explanation = Some(explanation);
        self
    }

    /// Sets the section lengths.
    #[must_use]
    pub const fn lengths(mut self, lengths: LengthInput) -> Self {
        self.lengths = Some(lengths);
        self
    }

    /// Sets the format flag.
    #[must_use]
    pub const fn well_formed(mut self, well_formed: bool) -> Self {
        self.well_formed = well_formed;
        self
    }
}

/// The expected answer and its context.
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    /// The reference SQL.
    pub sql: &'a str,
    /// Declared schema; validation is skipped without one.
    pub schema: Option<&'a Schema>,
    /// Question metadata.
    pub metadata: &'a QueryMetadata,
    /// `;`-separated hints supplied with the question.
    pub external_knowledge: Option<&'a str>,
}

impl<'a> Reference<'a> {
    /// A reference with no schema and no hints.
    #[must_use]
    pub const fn new(sql: &'a str, metadata: &'a QueryMetadata) -> Self {
        Self {
            sql,
            schema: None,
            metadata,
            external_knowledge: None,
        }
    }

    /// Sets the schema.
    #[must_use]
    pub const fn schema(mut self, schema: &'a Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the external knowledge.
    #[must_use]
    pub const fn external_knowledge(mut self, knowledge: &'a str) -> Self {
        self.external_knowledge = Some(knowledge);
        self
    }
}

/// Everything an evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Validation result; `None` when the format gate failed.
    pub validation: Option<ValidationResult>,
    /// Equivalence verdict; `None` when an earlier gate failed.
    pub comparison: Option<ComparisonOutcome>,
    /// Per-component contributions.
    pub breakdown: ScoreBreakdown,
    /// The bounded final score.
    pub final_score: f64,
    /// The gate that stopped the evaluation, if any.
    pub failed_gate: Option<Gate>,
}

/// Scores candidate answers against references.
///
/// Holds only configuration; each call to [`Evaluator::evaluate`] is
/// independent.
#[derive(Debug, Clone)]
pub struct Evaluator<D: Dialect = GenericDialect> {
    dialect: D,
    config: EvaluatorConfig,
    validator: SchemaValidator,
}

impl Evaluator {
    /// Creates an evaluator for the generic dialect.
    #[must_use]
    pub fn new(config: EvaluatorConfig) -> Self {
        Self::with_dialect(GenericDialect::new(), config)
    }
}

impl<D: Dialect> Evaluator<D> {
    /// Creates an evaluator for a specific dialect.
    #[must_use]
    pub fn with_dialect(dialect: D, config: EvaluatorConfig) -> Self {
        let validator = SchemaValidator::new(config.validator.clone());
        Self {
            dialect,
            config,
            validator,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Runs the Format, Validity and Equivalence gates and scores the result.
    ///
    /// With a connection, equivalence is decided by running both queries;
    /// otherwise by comparing their structure.
    pub fn evaluate(
        &self,
        candidate: &Candidate<'_>,
        reference: &Reference<'_>,
        connection: Option<&mut dyn Connection>,
    ) -> Evaluation {
        let mut card = ScoreCard::new(&self.config.scoring);
        let mut evaluation = Evaluation {
            validation: None,
            comparison: None,
            breakdown: ScoreBreakdown::new(),
            final_score: 0.0,
            failed_gate: None,
        };

        let sql = candidate.sql.filter(|_| candidate.well_formed);
        debug!(
            gate = ?Gate::Format,
            passed = sql.is_some(),
            db_id = reference.metadata.db_id.as_deref(),
            "Evaluating candidate"
        );
        let Some(sql) = sql else {
            card.record(Gate::Format, false);
            return finish(evaluation, card);
        };
        card.record(Gate::Format, true);

        let parsed = match parse(sql, &self.dialect, &self.config.parser) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(gate = ?Gate::Validity, error = %err, "Candidate rejected");
                evaluation.validation = Some(ValidationResult::failed(err.to_string()));
                card.record(Gate::Validity, false);
                return finish(evaluation, card);
            }
        };
        let validation = self
            .validator
            .check(&parsed, reference.schema, reference.metadata);
        debug!(
            gate = ?Gate::Validity,
            passed = validation.valid,
            reason = validation.reason.as_deref(),
            "Validated candidate"
        );
        let valid = validation.valid;
        evaluation.validation = Some(validation);
        if !card.record(Gate::Validity, valid) {
            return finish(evaluation, card);
        }

        let reference_parsed = match parse(reference.sql, &self.dialect, &self.config.parser) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(error = %err, "Reference query does not parse");
                None
            }
        };
        let comparison = compare::compare_with(
            &parsed,
            reference.sql,
            reference_parsed.as_ref(),
            reference.metadata,
            connection,
            &self.config.execution,
        );
        debug!(
            gate = ?Gate::Equivalence,
            passed = comparison.matched,
            strategy = %comparison.strategy,
            reason = comparison.reason.as_deref(),
            "Compared candidate"
        );
        card.record(Gate::Equivalence, comparison.matched);

        if let Some(text) = candidate.explanation {
            let input = ExplanationInput {
                text,
                candidate_sql: Some(sql),
                reference_sql: reference.sql,
                external_knowledge: reference.external_knowledge,
                correct: comparison.matched,
            };
            card.add_explanation(score_explanation(
                &self.config.explanation,
                &input,
                self.config.scoring.explanation_max,
            ));
        }
        if let Some(lengths) = &candidate.lengths {
            card.add_length(lengths);
        }
        evaluation.comparison = Some(comparison);

        finish(evaluation, card)
    }
}

fn finish(mut evaluation: Evaluation, card: ScoreCard<'_>) -> Evaluation {
    let score = card.finish();
    evaluation.breakdown = score.breakdown;
    evaluation.final_score = score.score;
    evaluation.failed_gate = score.failed_gate;
    evaluation
}
