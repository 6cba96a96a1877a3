//! Execution-based equivalence against an in-memory SQLite database.

use std::time::Duration;

use sqlreward_core::execution::{self, Connection, ExecutionConfig, ExecutionError};
use sqlreward_core::metadata::{Complexity, Style};
use sqlreward_core::scoring::Gate;
use sqlreward_core::{
    Candidate, Evaluator, EvaluatorConfig, QueryMetadata, Reference, Schema, Strategy,
};
use sqlreward_sqlite::{SqliteConnection, SqliteDialect};

fn snippets() -> SqliteConnection {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE code_snippets (
             snippet_id INTEGER PRIMARY KEY,
             description TEXT,
             complexity INTEGER,
             is_public INTEGER,
             owner_id INTEGER
         );
         CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT, email TEXT);
         INSERT INTO users VALUES (1, 'ada', 'ada@example.com'), (2, 'bob', NULL);
         INSERT INTO code_snippets VALUES
             (1, 'parser', 7, 1, 1),
             (2, 'lexer', 3, 1, 1),
             (3, 'planner', 9, 0, 2),
             (4, 'parser', 8, 1, 2);",
    )
    .unwrap();
    SqliteConnection::new(conn)
}

fn schema() -> Schema {
    Schema::new()
        .table(
            "code_snippets",
            ["snippet_id", "description", "complexity", "is_public", "owner_id"],
        )
        .table("users", ["user_id", "name", "email"])
}

#[test]
fn duplicates_are_counted() {
    let mut conn = snippets();
    let outcome = execution::compare(
        "SELECT DISTINCT description FROM code_snippets WHERE complexity > 5",
        "SELECT description FROM code_snippets WHERE complexity > 5",
        &mut conn,
        false,
    );
    assert!(!outcome.matched);
    assert_eq!(outcome.reason.as_deref(), Some("row count differs: 2 vs 3"));
}

#[test]
fn unordered_results_ignore_row_order() {
    let mut conn = snippets();
    let candidate = "SELECT snippet_id FROM code_snippets ORDER BY snippet_id DESC";
    let reference = "SELECT snippet_id FROM code_snippets ORDER BY snippet_id";
    assert!(execution::compare(candidate, reference, &mut conn, false).matched);

    let ordered = execution::compare(candidate, reference, &mut conn, true);
    assert!(!ordered.matched);
    assert_eq!(ordered.reason.as_deref(), Some("row 0 differs"));
}

#[test]
fn integral_reals_match_integers() {
    let mut conn = snippets();
    let candidate = "SELECT CAST(complexity AS REAL) FROM code_snippets";
    let reference = "SELECT complexity FROM code_snippets";
    assert!(execution::compare(candidate, reference, &mut conn, false).matched);
    assert!(execution::compare("SELECT 2.0", "SELECT 2", &mut conn, true).matched);
    assert!(!execution::compare("SELECT 2.5", "SELECT 2", &mut conn, true).matched);

    let strict = ExecutionConfig::default().numeric_coercion(false);
    let outcome = execution::compare_with(candidate, reference, &mut conn, false, &strict);
    assert!(!outcome.matched);
}

#[test]
fn evaluator_honors_numeric_coercion_setting() {
    let schema = schema();
    let metadata = QueryMetadata::new().style(Style::Vague);
    let reference =
        Reference::new("SELECT SUM(complexity) FROM code_snippets", &metadata).schema(&schema);
    let candidate = Candidate::sql("SELECT TOTAL(complexity) FROM code_snippets");
    let mut conn = snippets();

    let evaluator = Evaluator::with_dialect(SqliteDialect::new(), EvaluatorConfig::default());
    let evaluation = evaluator.evaluate(&candidate, &reference, Some(&mut conn));
    assert_eq!(evaluation.failed_gate, None);

    let config: EvaluatorConfig =
        serde_json::from_str(r#"{"execution": {"numeric_coercion": false}}"#).unwrap();
    let evaluator = Evaluator::with_dialect(SqliteDialect::new(), config);
    let evaluation = evaluator.evaluate(&candidate, &reference, Some(&mut conn));
    assert_eq!(evaluation.failed_gate, Some(Gate::Equivalence));
}

#[test]
fn failing_queries_are_negative_verdicts() {
    let mut conn = snippets();
    let outcome = execution::compare(
        "SELECT missing FROM code_snippets",
        "SELECT description FROM code_snippets",
        &mut conn,
        false,
    );
    assert!(!outcome.matched);
    assert_eq!(outcome.strategy, Strategy::Execution);
    assert!(
        outcome
            .reason
            .as_deref()
            .is_some_and(|r| r.starts_with("candidate: query failed")),
        "{:?}",
        outcome.reason
    );

    let outcome = execution::compare(
        "SELECT description FROM code_snippets",
        "SELECT description FROM nowhere",
        &mut conn,
        false,
    );
    assert!(outcome
        .reason
        .as_deref()
        .is_some_and(|r| r.starts_with("reference: query failed")));
}

#[test]
fn writes_are_refused() {
    let mut conn = snippets();
    assert_eq!(
        conn.query("DELETE FROM code_snippets"),
        Err(ExecutionError::ReadOnlyViolation)
    );
    assert_eq!(
        conn.query("UPDATE users SET name = 'x'"),
        Err(ExecutionError::ReadOnlyViolation)
    );
    let rows = conn.query("SELECT COUNT(*) FROM code_snippets").unwrap();
    assert_eq!(rows, vec![vec![sqlreward_core::Value::Integer(4)]]);

    let outcome = execution::compare(
        "DELETE FROM users",
        "SELECT name FROM users",
        &mut conn,
        false,
    );
    assert_eq!(
        outcome.reason.as_deref(),
        Some("candidate: statement is not read-only")
    );
}

#[test]
fn busy_timeout_is_accepted() {
    let mut conn = snippets().busy_timeout(Duration::from_millis(50)).unwrap();
    assert_eq!(conn.query("SELECT 1").unwrap().len(), 1);
}

#[test]
fn evaluator_uses_execution_when_connected() {
    let schema = schema();
    let metadata = QueryMetadata::new()
        .complexity(Complexity::Moderate)
        .style(Style::Vague);
    let reference = Reference::new(
        "SELECT u.name, COUNT(*) FROM users u JOIN code_snippets c ON c.owner_id = u.user_id \
         WHERE c.is_public = 1 GROUP BY u.name",
        &metadata,
    )
    .schema(&schema);
    // Different shape, same rows.
    let candidate = Candidate::sql(
        "SELECT [name], (SELECT COUNT(*) FROM code_snippets \
         WHERE owner_id == users.user_id AND is_public == 1) \
         FROM users ORDER BY user_id DESC",
    );

    let evaluator = Evaluator::with_dialect(SqliteDialect::new(), EvaluatorConfig::default());
    let mut conn = snippets();
    let evaluation = evaluator.evaluate(&candidate, &reference, Some(&mut conn));

    let comparison = evaluation.comparison.unwrap();
    assert_eq!(comparison.strategy, Strategy::Execution);
    assert!(comparison.matched, "{:?}", comparison.reason);
    assert_eq!(evaluation.failed_gate, None);
    assert!((evaluation.final_score - 10.0).abs() < 1e-9);
}

#[test]
fn reference_order_by_makes_execution_ordered() {
    let schema = schema();
    let metadata = QueryMetadata::new().style(Style::Vague);
    let reference = Reference::new(
        "SELECT snippet_id FROM code_snippets ORDER BY complexity",
        &metadata,
    )
    .schema(&schema);
    let candidate = Candidate::sql("SELECT snippet_id FROM code_snippets ORDER BY snippet_id");

    let evaluator = Evaluator::with_dialect(SqliteDialect::new(), EvaluatorConfig::default());
    let mut conn = snippets();
    let evaluation = evaluator.evaluate(&candidate, &reference, Some(&mut conn));

    assert_eq!(evaluation.failed_gate, Some(Gate::Equivalence));
    assert_eq!(
        evaluation.comparison.and_then(|c| c.reason).as_deref(),
        Some("row 0 differs")
    );
}

#[test]
fn evaluation_report_serializes() {
    let schema = schema();
    let metadata = QueryMetadata::new().style(Style::Vague);
    let reference = Reference::new("SELECT name FROM users", &metadata).schema(&schema);
    let evaluator = Evaluator::with_dialect(SqliteDialect::new(), EvaluatorConfig::default());
    let mut conn = snippets();
    let evaluation = evaluator.evaluate(
        &Candidate::sql("SELECT email FROM users"),
        &reference,
        Some(&mut conn),
    );

    let json = serde_json::to_value(&evaluation).unwrap();
    assert_eq!(json["comparison"]["strategy"], "execution");
    assert_eq!(json["comparison"]["reason"], "rows differ");
    assert_eq!(json["failed_gate"], "equivalence");
}
