//! Result-set comparison against a live database.
//!
//! Both queries run on a caller-owned [`Connection`]; their rows are compared
//! either in order or as a multiset. Every failure on the way becomes a
//! negative verdict. By default an integral real equals the matching integer;
//! see [`ExecutionConfig`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{ComparisonOutcome, Strategy};
use crate::metadata::Style;
use crate::parser::ParsedSql;

/// A single cell value, as returned by the database.
#[derive(Debug, Clone, Serialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

/// 2^63, the first real past the `i64` range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl Value {
    /// Folds a real with no fractional part into the equal integer.
    ///
    /// Other values are returned unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn coerce_numeric(self) -> Self {
        match self {
            Self::Real(r)
                if r.fract().abs().total_cmp(&0.0).is_eq()
                    && (-I64_BOUND..I64_BOUND).contains(&r) =>
            {
                Self::Integer(r as i64)
            }
            other => other,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Integer(_) => 1,
            Self::Real(_) => 2,
            Self::Text(_) => 3,
            Self::Blob(_) => 4,
        }
    }
}

// Floats use their total order so that rows can be sorted and NaN equals
// itself.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Blob(a), Self::Blob(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Blob(b) => {
                write!(f, "X'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                write!(f, "'")
            }
        }
    }
}

/// One result row.
pub type Row = Vec<Value>;

/// Errors raised by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The database rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),

    /// The statement would modify the database.
    #[error("statement is not read-only")]
    ReadOnlyViolation,

    /// The database did not answer in time.
    #[error("query timed out")]
    Timeout,

    /// The backend itself failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// A database that can answer read-only queries.
pub trait Connection {
    /// Runs `sql` and returns every row.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] if the query cannot be run to completion.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ExecutionError>;
}

/// Result comparison settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Treat `Integer(n)` and `Real(n.0)` as equal.
    pub numeric_coercion: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            numeric_coercion: true,
        }
    }
}

impl ExecutionConfig {
    /// Sets whether integral reals equal integers.
    #[must_use]
    pub const fn numeric_coercion(mut self, enabled: bool) -> Self {
        self.numeric_coercion = enabled;
        self
    }
}

/// Returns whether row order matters when comparing results.
///
/// It does when the reference sorts its result at the top level or when the
/// question is not vaguely phrased. A reference that did not parse is treated
/// as ordered.
#[must_use]
pub fn order_sensitive(reference: Option<&ParsedSql>, style: Option<Style>) -> bool {
    let Some(reference) = reference else {
        return true;
    };
    let sorted = reference
        .statement()
        .as_query()
        .is_some_and(|query| !query.order_by.is_empty());
    sorted || style != Some(Style::Vague)
}

/// Runs both queries and compares their rows with the default settings.
#[must_use]
pub fn compare(
    candidate_sql: &str,
    reference_sql: &str,
    connection: &mut dyn Connection,
    order_sensitive: bool,
) -> ComparisonOutcome {
    compare_with(
        candidate_sql,
        reference_sql,
        connection,
        order_sensitive,
        &ExecutionConfig::default(),
    )
}

/// Runs both queries and compares their rows.
#[must_use]
pub fn compare_with(
    candidate_sql: &str,
    reference_sql: &str,
    connection: &mut dyn Connection,
    order_sensitive: bool,
    config: &ExecutionConfig,
) -> ComparisonOutcome {
    let candidate = match connection.query(candidate_sql) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "Candidate query failed");
            return ComparisonOutcome::mismatched(
                Strategy::Execution,
                format!("candidate: {err}"),
            );
        }
    };
    let reference = match connection.query(reference_sql) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "Reference query failed");
            return ComparisonOutcome::mismatched(
                Strategy::Execution,
                format!("reference: {err}"),
            );
        }
    };

    debug!(
        candidate_rows = candidate.len(),
        reference_rows = reference.len(),
        order_sensitive,
        numeric_coercion = config.numeric_coercion,
        "Comparing result sets"
    );

    let (candidate, reference) = if config.numeric_coercion {
        (coerce_rows(candidate), coerce_rows(reference))
    } else {
        (candidate, reference)
    };
    match diff_rows(candidate, reference, order_sensitive) {
        None => ComparisonOutcome::matched(Strategy::Execution),
        Some(reason) => ComparisonOutcome::mismatched(Strategy::Execution, reason),
    }
}

fn coerce_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| row.into_iter().map(Value::coerce_numeric).collect())
        .collect()
}

fn diff_rows(mut candidate: Vec<Row>, mut reference: Vec<Row>, ordered: bool) -> Option<String> {
    if candidate.len() != reference.len() {
        return Some(format!(
            "row count differs: {} vs {}",
            candidate.len(),
            reference.len()
        ));
    }
    if !ordered {
        candidate.sort();
        reference.sort();
    }
    candidate
        .iter()
        .zip(&reference)
        .position(|(a, b)| a != b)
        .map(|index| {
            if ordered {
                format!("row {index} differs")
            } else {
                "rows differ".to_owned()
            }
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::dialect::GenericDialect;
    use crate::parser::{parse, ParserConfig};

    /// Answers queries from a fixed table of results.
    #[derive(Default)]
    struct FakeConnection {
        results: HashMap<String, Result<Vec<Row>, ExecutionError>>,
    }

    impl FakeConnection {
        fn with(mut self, sql: &str, result: Result<Vec<Row>, ExecutionError>) -> Self {
            self.results.insert(sql.to_owned(), result);
            self
        }
    }

    impl Connection for FakeConnection {
        fn query(&mut self, sql: &str) -> Result<Vec<Row>, ExecutionError> {
            self.results
                .get(sql)
                .cloned()
                .unwrap_or_else(|| Err(ExecutionError::Query(format!("no such query: {sql}"))))
        }
    }

    fn ints(values: &[&[i64]]) -> Vec<Row> {
        values
            .iter()
            .map(|row| row.iter().copied().map(Value::Integer).collect())
            .collect()
    }

    #[test]
    fn test_duplicate_rows_count() {
        let mut conn = FakeConnection::default()
            .with("a", Ok(ints(&[&[1], &[1], &[2]])))
            .with("b", Ok(ints(&[&[1], &[2], &[2]])))
            .with("c", Ok(ints(&[&[2], &[1], &[1]])));
        let outcome = compare("a", "b", &mut conn, false);
        assert!(!outcome.matched);
        assert_eq!(outcome.strategy, Strategy::Execution);
        assert!(compare("a", "c", &mut conn, false).matched);
    }

    #[test]
    fn test_order_sensitive_comparison() {
        let mut conn = FakeConnection::default()
            .with("a", Ok(ints(&[&[1], &[2]])))
            .with("b", Ok(ints(&[&[2], &[1]])));
        assert!(compare("a", "b", &mut conn, false).matched);
        let outcome = compare("a", "b", &mut conn, true);
        assert!(!outcome.matched);
        assert_eq!(outcome.reason.as_deref(), Some("row 0 differs"));
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut conn = FakeConnection::default()
            .with("a", Ok(ints(&[&[1]])))
            .with("b", Ok(ints(&[&[1], &[1]])));
        let outcome = compare("a", "b", &mut conn, false);
        assert_eq!(outcome.reason.as_deref(), Some("row count differs: 1 vs 2"));
    }

    #[test]
    fn test_errors_become_negative_verdicts() {
        let mut conn = FakeConnection::default()
            .with("bad", Err(ExecutionError::Timeout))
            .with("ok", Ok(Vec::new()))
            .with("write", Err(ExecutionError::ReadOnlyViolation));

        let outcome = compare("bad", "ok", &mut conn, false);
        assert!(!outcome.matched);
        assert_eq!(outcome.reason.as_deref(), Some("candidate: query timed out"));

        let outcome = compare("ok", "write", &mut conn, false);
        assert_eq!(
            outcome.reason.as_deref(),
            Some("reference: statement is not read-only")
        );
    }

    #[test]
    fn test_values_order_across_types() {
        let mut values = vec![
            Value::Text("a".into()),
            Value::Real(1.5),
            Value::Null,
            Value::Integer(3),
            Value::Real(f64::NAN),
        ];
        values.sort();
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Integer(3));
        assert_eq!(values[2], Value::Real(1.5));
        assert_eq!(values[3], Value::Real(f64::NAN));
        assert_eq!(values[4], Value::Text("a".into()));
        assert_ne!(Value::Integer(1), Value::Real(1.0));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Real(2.0).coerce_numeric(), Value::Integer(2));
        assert_eq!(Value::Real(-0.0).coerce_numeric(), Value::Integer(0));
        assert_eq!(Value::Real(2.5).coerce_numeric(), Value::Real(2.5));
        assert_eq!(Value::Real(1e19).coerce_numeric(), Value::Real(1e19));
        assert_eq!(Value::Real(f64::INFINITY).coerce_numeric(), Value::Real(f64::INFINITY));
        assert_eq!(Value::Real(f64::NAN).coerce_numeric(), Value::Real(f64::NAN));
        assert_eq!(Value::Text("2".into()).coerce_numeric(), Value::Text("2".into()));

        let mut conn = FakeConnection::default()
            .with("int", Ok(ints(&[&[2], &[1]])))
            .with("real", Ok(vec![vec![Value::Real(1.0)], vec![Value::Real(2.0)]]));
        assert!(compare("int", "real", &mut conn, false).matched);

        let strict = ExecutionConfig::default().numeric_coercion(false);
        let outcome = compare_with("int", "real", &mut conn, false, &strict);
        assert!(!outcome.matched);
        assert_eq!(outcome.reason.as_deref(), Some("rows differ"));
    }

    #[test]
    fn test_order_sensitivity_rule() {
        let config = ParserConfig::default();
        let dialect = GenericDialect::new();
        let sorted = parse("SELECT a FROM t ORDER BY a", &dialect, &config).unwrap();
        let unsorted = parse("SELECT a FROM t", &dialect, &config).unwrap();

        assert!(order_sensitive(Some(&sorted), Some(Style::Vague)));
        assert!(!order_sensitive(Some(&unsorted), Some(Style::Vague)));
        assert!(order_sensitive(Some(&unsorted), Some(Style::Colloquial)));
        assert!(order_sensitive(Some(&unsorted), None));
        assert!(order_sensitive(None, Some(Style::Vague)));
    }
}
