//! Query equivalence.
//!
//! [`select_strategy`] picks how two queries are compared; [`compare`] runs
//! that strategy and reports a [`ComparisonOutcome`]. The exact and
//! structural strategies work on parsed statements, the execution strategy
//! on SQL text through a [`Connection`].

mod clause;
mod condition;
mod policy;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

pub use clause::{Clause, ClauseKind, ClauseMismatch, CompareMode, FromItem};
pub use condition::Condition;
pub use policy::{select_strategy, Strategy};

use crate::ast::{Cte, Query, SelectStatement, SetExpr, Statement, With};
use crate::execution::{self, Connection, ExecutionConfig};
use crate::metadata::QueryMetadata;
use crate::normalize::Normalizer;
use crate::parser::ParsedSql;
use crate::validate::AliasMap;

/// The verdict of comparing a candidate query with a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonOutcome {
    /// Whether the queries were judged equivalent.
    pub matched: bool,
    /// The strategy that produced the verdict.
    pub strategy: Strategy,
    /// Why the queries differ, or why no verdict could be reached.
    pub reason: Option<String>,
}

impl ComparisonOutcome {
    /// A positive verdict.
    #[must_use]
    pub const fn matched(strategy: Strategy) -> Self {
        Self {
            matched: true,
            strategy,
            reason: None,
        }
    }

    /// A negative verdict with a reason.
    #[must_use]
    pub fn mismatched(strategy: Strategy, reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            strategy,
            reason: Some(reason.into()),
        }
    }

    fn from_result(strategy: Strategy, result: Result<(), Mismatch>) -> Self {
        match result {
            Ok(()) => Self::matched(strategy),
            Err(mismatch) => Self::mismatched(strategy, mismatch.to_string()),
        }
    }
}

/// Where two statements first diverge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    /// A clause differs.
    #[error(transparent)]
    Clause(#[from] ClauseMismatch),
    /// Only one side has a WITH clause.
    #[error("WITH clause present in only one query")]
    With,
    /// Only one side is WITH RECURSIVE.
    #[error("RECURSIVE differs")]
    Recursive,
    /// The CTE names differ.
    #[error("CTE names differ")]
    CteNames,
    /// A CTE declares different column names.
    #[error("CTE '{0}' column list differs")]
    CteColumns(String),
    /// The set-operation trees have a different shape or operators.
    #[error("set operation differs")]
    SetOperation,
    /// The statements are of different kinds.
    #[error("statement kinds differ: {candidate} vs {reference}")]
    StatementKind {
        /// Kind of the candidate.
        candidate: &'static str,
        /// Kind of the reference.
        reference: &'static str,
    },
    /// The normalized texts differ and no clause-level reason was found.
    #[error("normalized queries differ")]
    Text,
}

/// Compares a candidate with the reference using the strategy selected for
/// `metadata`.
///
/// `reference` is the parsed reference, `None` when it does not parse; the
/// execution strategy only needs `reference_sql`. Failures never propagate:
/// they become negative verdicts.
#[must_use]
pub fn compare(
    candidate: &ParsedSql,
    reference_sql: &str,
    reference: Option<&ParsedSql>,
    metadata: &QueryMetadata,
    connection: Option<&mut dyn Connection>,
) -> ComparisonOutcome {
    compare_with(
        candidate,
        reference_sql,
        reference,
        metadata,
        connection,
        &ExecutionConfig::default(),
    )
}

/// Like [`compare`], with explicit result comparison settings for the
/// execution strategy.
#[must_use]
pub fn compare_with(
    candidate: &ParsedSql,
    reference_sql: &str,
    reference: Option<&ParsedSql>,
    metadata: &QueryMetadata,
    connection: Option<&mut dyn Connection>,
    execution: &ExecutionConfig,
) -> ComparisonOutcome {
    let strategy = select_strategy(metadata, connection.is_some());
    debug!(
        %strategy,
        complexity = ?metadata.complexity,
        style = ?metadata.style,
        "Selected equivalence strategy"
    );

    if let Some(connection) = connection {
        let ordered = execution::order_sensitive(reference, metadata.style);
        return execution::compare_with(
            candidate.text(),
            reference_sql,
            connection,
            ordered,
            execution,
        );
    }

    let Some(reference) = reference else {
        return ComparisonOutcome::mismatched(strategy, "reference query does not parse");
    };
    match strategy {
        Strategy::Exact => compare_exact(candidate.statement(), reference.statement()),
        Strategy::Structural | Strategy::Execution => {
            compare_structural(candidate.statement(), reference.statement())
        }
    }
}

/// Compares the normalized text of two statements.
///
/// On a mismatch between two single SELECT blocks, the reason names the
/// first clause that differs, with projection order taken into account.
#[must_use]
pub fn compare_exact(candidate: &Statement, reference: &Statement) -> ComparisonOutcome {
    let n = Normalizer::new();
    if n.statement(candidate) == n.statement(reference) {
        return ComparisonOutcome::matched(Strategy::Exact);
    }
    let reason = first_difference(candidate, reference).unwrap_or(Mismatch::Text);
    ComparisonOutcome::mismatched(Strategy::Exact, reason.to_string())
}

fn first_difference(candidate: &Statement, reference: &Statement) -> Option<Mismatch> {
    let (a, b) = (candidate.as_query()?, reference.as_query()?);
    let n = Normalizer::new();
    let mut clauses = Vec::new();
    if let (Some(sa), Some(sb)) = (a.as_select(), b.as_select()) {
        for kind in ClauseKind::SELECT_BLOCK {
            clauses.push((Clause::of_select(kind, sa, &n), Clause::of_select(kind, sb, &n)));
        }
    }
    for kind in ClauseKind::QUERY {
        clauses.push((Clause::of_query(kind, a, &n), Clause::of_query(kind, b, &n)));
    }
    clauses
        .iter()
        .find_map(|(x, y)| x.compare(y, CompareMode::Ordered).err())
        .map(Mismatch::from)
}

/// Compares two statements clause by clause.
///
/// Column qualifiers are resolved through each statement's own aliases,
/// set-operation trees must have the same shape and CTEs are paired by name.
/// Statements that are not queries are compared by their structural text.
#[must_use]
pub fn compare_structural(candidate: &Statement, reference: &Statement) -> ComparisonOutcome {
    let candidate_aliases = AliasMap::build(candidate);
    let reference_aliases = AliasMap::build(reference);
    let pair = Pair {
        candidate: Normalizer::structural(&candidate_aliases),
        reference: Normalizer::structural(&reference_aliases),
    };
    ComparisonOutcome::from_result(Strategy::Structural, pair.statement(candidate, reference))
}

/// One normalizer per side.
struct Pair<'a> {
    candidate: Normalizer<'a>,
    reference: Normalizer<'a>,
}

impl Pair<'_> {
    fn statement(&self, a: &Statement, b: &Statement) -> Result<(), Mismatch> {
        match (a, b) {
            (Statement::Query(a), Statement::Query(b)) => self.query(a, b),
            _ if a.kind() != b.kind() => Err(Mismatch::StatementKind {
                candidate: a.kind().as_str(),
                reference: b.kind().as_str(),
            }),
            _ if self.candidate.statement(a) == self.reference.statement(b) => Ok(()),
            _ => Err(Mismatch::Text),
        }
    }

    fn query(&self, a: &Query, b: &Query) -> Result<(), Mismatch> {
        self.with(a.with.as_ref(), b.with.as_ref())?;
        self.set_expr(&a.body, &b.body)?;
        for kind in ClauseKind::QUERY {
            let x = Clause::of_query(kind, a, &self.candidate);
            let y = Clause::of_query(kind, b, &self.reference);
            x.compare(&y, CompareMode::Unordered)?;
        }
        Ok(())
    }

    fn with(&self, a: Option<&With>, b: Option<&With>) -> Result<(), Mismatch> {
        let (a, b) = match (a, b) {
            (None, None) => return Ok(()),
            (Some(a), Some(b)) => (a, b),
            _ => return Err(Mismatch::With),
        };
        if a.recursive != b.recursive {
            return Err(Mismatch::Recursive);
        }

        let (a_ctes, b_ctes) = (ctes_by_name(a), ctes_by_name(b));
        if !a_ctes.keys().eq(b_ctes.keys()) {
            return Err(Mismatch::CteNames);
        }
        for ((name, x), y) in a_ctes.iter().zip(b_ctes.values()) {
            if !lowercase(&x.columns).eq(lowercase(&y.columns)) {
                return Err(Mismatch::CteColumns(name.clone()));
            }
            self.query(&x.query, &y.query)?;
        }
        Ok(())
    }

    fn set_expr(&self, a: &SetExpr, b: &SetExpr) -> Result<(), Mismatch> {
        match (operand(a), operand(b)) {
            (SetExpr::Select(a), SetExpr::Select(b)) => self.select(a, b),
            (SetExpr::Query(a), SetExpr::Query(b)) => self.query(a, b),
            (
                SetExpr::SetOperation {
                    op: a_op,
                    all: a_all,
                    left: a_left,
                    right: a_right,
                },
                SetExpr::SetOperation {
                    op: b_op,
                    all: b_all,
                    left: b_left,
                    right: b_right,
                },
            ) if a_op == b_op && a_all == b_all => {
                self.set_expr(a_left, b_left)?;
                self.set_expr(a_right, b_right)
            }
            _ => Err(Mismatch::SetOperation),
        }
    }

    fn select(&self, a: &SelectStatement, b: &SelectStatement) -> Result<(), Mismatch> {
        for kind in ClauseKind::SELECT_BLOCK {
            let x = Clause::of_select(kind, a, &self.candidate);
            let y = Clause::of_select(kind, b, &self.reference);
            x.compare(&y, CompareMode::Unordered)?;
        }
        Ok(())
    }
}

/// Looks through `(query)` operands that carry nothing but a body.
fn operand(set_expr: &SetExpr) -> &SetExpr {
    match set_expr {
        SetExpr::Query(query)
            if query.with.is_none()
                && query.order_by.is_empty()
                && query.limit.is_none()
                && query.offset.is_none() =>
        {
            operand(&query.body)
        }
        other => other,
    }
}

fn ctes_by_name(with: &With) -> BTreeMap<String, &Cte> {
    with.ctes
        .iter()
        .map(|cte| (cte.name.to_ascii_lowercase(), cte))
        .collect()
}

fn lowercase(names: &[String]) -> impl Iterator<Item = String> + '_ {
    names.iter().map(|name| name.to_ascii_lowercase())
}
