#![allow(dead_code)]

use sqlreward_core::ast::{
    DeleteStatement, InsertStatement, Query, SelectStatement, Statement, UpdateStatement,
};
use sqlreward_core::dialect::GenericDialect;
use sqlreward_core::normalize::Normalizer;
use sqlreward_core::{ParseError, ParsedSql, Parser, ParserConfig, Schema};

pub fn parse(sql: &str) -> Statement {
    Parser::new(sql, &GenericDialect::new())
        .parse_statement()
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn parse_err(sql: &str) -> ParseError {
    Parser::new(sql, &GenericDialect::new())
        .parse_statement()
        .expect_err(&format!("Expected parse error for: {sql}"))
}

pub fn parsed(sql: &str) -> ParsedSql {
    sqlreward_core::parse(sql, &GenericDialect::new(), &ParserConfig::default())
        .unwrap_or_else(|e| panic!("Failed to build: {sql}\nError: {e}"))
}

pub fn parse_query(sql: &str) -> Query {
    match parse(sql) {
        Statement::Query(q) => *q,
        other => panic!("Expected query, got {other:?}"),
    }
}

pub fn parse_select(sql: &str) -> SelectStatement {
    let query = parse_query(sql);
    match query.as_select() {
        Some(s) => s.clone(),
        None => panic!("Expected a single SELECT, got {query:?}"),
    }
}

pub fn parse_insert(sql: &str) -> InsertStatement {
    match parse(sql) {
        Statement::Insert(i) => i,
        other => panic!("Expected INSERT, got {other:?}"),
    }
}

pub fn parse_update(sql: &str) -> UpdateStatement {
    match parse(sql) {
        Statement::Update(u) => u,
        other => panic!("Expected UPDATE, got {other:?}"),
    }
}

pub fn parse_delete(sql: &str) -> DeleteStatement {
    match parse(sql) {
        Statement::Delete(d) => d,
        other => panic!("Expected DELETE, got {other:?}"),
    }
}

/// Verifies that normalization is a fixed point: normalizing the
/// normalized text of `sql` yields the same text again.
pub fn round_trip(sql: &str) {
    let n = Normalizer::new();
    let rendered1 = n.statement(&parse(sql));
    let rendered2 = n.statement(&parse(&rendered1));
    assert_eq!(
        rendered1, rendered2,
        "Round-trip failed.\n  Input:    {sql}\n  First:    {rendered1}\n  Second:   {rendered2}"
    );
}

/// The schema used by the snippet scenarios.
pub fn snippets_schema() -> Schema {
    Schema::new()
        .table(
            "code_snippets",
            ["snippet_id", "description", "complexity", "is_public", "owner_id"],
        )
        .table("users", ["user_id", "name", "email"])
        .table("snippet_tags", ["snippet_id", "tag"])
}

/// Routes `tracing` output to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
