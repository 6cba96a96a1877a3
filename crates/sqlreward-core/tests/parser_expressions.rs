//! Tests for expressions: literals, operators, precedence, predicates,
//! functions, CASE and CAST.

mod common;
use common::*;

use sqlreward_core::ast::{BinaryOp, Expr, Literal, UnaryOp};

fn expr(sql: &str) -> Expr {
    let s = parse_select(&format!("SELECT {sql}"));
    s.columns.into_iter().next().unwrap().expr
}

#[test]
fn literals() {
    assert!(matches!(expr("42"), Expr::Literal(Literal::Integer(42))));
    assert!(matches!(expr("2.5"), Expr::Literal(Literal::Float(f)) if (f - 2.5).abs() < f64::EPSILON));
    assert!(matches!(expr("'it''s'"), Expr::Literal(Literal::String(s)) if s == "it's"));
    assert!(matches!(expr("X'00FF'"), Expr::Literal(Literal::Blob(b)) if b == [0x00, 0xff]));
    assert!(matches!(expr("TRUE"), Expr::Literal(Literal::Boolean(true))));
    assert!(matches!(expr("NULL"), Expr::Literal(Literal::Null)));
    round_trip("SELECT 42, 2.5, 'it''s', X'00FF', TRUE, NULL");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    match expr("1 + 2 * 3") {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        )),
        other => panic!("Expected addition, got {other:?}"),
    }
}

#[test]
fn and_binds_tighter_than_or() {
    let s = parse_select("SELECT 1 FROM t WHERE a = 1 OR b = 2 AND c = 3");
    match s.where_clause {
        Some(Expr::Binary {
            op: BinaryOp::Or,
            right,
            ..
        }) => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        )),
        other => panic!("Expected OR, got {other:?}"),
    }
}

#[test]
fn comparison_operators() {
    for (sql, op) in [
        ("a = 1", BinaryOp::Eq),
        ("a <> 1", BinaryOp::NotEq),
        ("a != 1", BinaryOp::NotEq),
        ("a < 1", BinaryOp::Lt),
        ("a <= 1", BinaryOp::LtEq),
        ("a > 1", BinaryOp::Gt),
        ("a >= 1", BinaryOp::GtEq),
        ("a || 'x'", BinaryOp::Concat),
        ("a % 2", BinaryOp::Mod),
    ] {
        assert!(
            matches!(expr(sql), Expr::Binary { op: found, .. } if found == op),
            "{sql}"
        );
    }
}

#[test]
fn unary_operators() {
    assert!(matches!(
        expr("-a"),
        Expr::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
    assert!(matches!(
        expr("NOT a"),
        Expr::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
    round_trip("SELECT -a, NOT a, - -a FROM t");
}

#[test]
fn negatable_predicates() {
    assert!(matches!(expr("a IS NULL"), Expr::IsNull { negated: false, .. }));
    assert!(matches!(expr("a IS NOT NULL"), Expr::IsNull { negated: true, .. }));
    assert!(matches!(expr("a IN (1, 2)"), Expr::InList { negated: false, list, .. } if list.len() == 2));
    assert!(matches!(expr("a NOT IN (1)"), Expr::InList { negated: true, .. }));
    assert!(matches!(expr("a BETWEEN 1 AND 5"), Expr::Between { negated: false, .. }));
    assert!(matches!(expr("a NOT BETWEEN 1 AND 5"), Expr::Between { negated: true, .. }));
    assert!(matches!(expr("a LIKE 'x%'"), Expr::Like { negated: false, .. }));
    assert!(matches!(expr("a NOT LIKE 'x%'"), Expr::Like { negated: true, .. }));
    round_trip(
        "SELECT 1 FROM t WHERE a IS NOT NULL AND b NOT IN (1, 2) \
         AND c NOT BETWEEN 1 AND 5 AND d NOT LIKE 'x%'",
    );
}

#[test]
fn between_inside_conjunction() {
    let s = parse_select("SELECT 1 FROM t WHERE a BETWEEN 1 AND 5 AND b = 2");
    assert!(matches!(
        s.where_clause,
        Some(Expr::Binary {
            op: BinaryOp::And,
            ..
        })
    ));
}

#[test]
fn function_calls() {
    match expr("COUNT(DISTINCT user_id)") {
        Expr::Function(call) => {
            assert_eq!(call.name, "COUNT");
            assert!(call.distinct);
            assert_eq!(call.args.len(), 1);
        }
        other => panic!("Expected function, got {other:?}"),
    }
    match expr("count(*)") {
        Expr::Function(call) => assert!(matches!(call.args[0], Expr::Wildcard { table: None })),
        other => panic!("Expected function, got {other:?}"),
    }
    round_trip("SELECT COUNT(DISTINCT user_id), count(*), coalesce(a, b, 0), LEFT(name, 3) FROM t");
}

#[test]
fn case_expressions() {
    match expr("CASE WHEN a > 1 THEN 'big' WHEN a = 1 THEN 'one' ELSE 'small' END") {
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            assert!(operand.is_none());
            assert_eq!(when_clauses.len(), 2);
            assert!(else_clause.is_some());
        }
        other => panic!("Expected CASE, got {other:?}"),
    }
    assert!(matches!(
        expr("CASE status WHEN 1 THEN 'on' END"),
        Expr::Case {
            operand: Some(_),
            ..
        }
    ));
    round_trip("SELECT CASE status WHEN 1 THEN 'on' ELSE 'off' END FROM t");
}

#[test]
fn cast_expressions() {
    match expr("CAST(price AS DECIMAL(10, 2))") {
        Expr::Cast { data_type, .. } => assert_eq!(data_type.to_string(), "DECIMAL(10, 2)"),
        other => panic!("Expected CAST, got {other:?}"),
    }
    round_trip("SELECT CAST(price AS REAL) FROM t");
}

#[test]
fn quoted_identifiers() {
    match expr("\"Order\".\"Total Amount\"") {
        Expr::Column { table, name, .. } => {
            assert_eq!(table.as_deref(), Some("Order"));
            assert_eq!(name, "Total Amount");
        }
        other => panic!("Expected column, got {other:?}"),
    }
    round_trip("SELECT \"Order\".\"Total Amount\" FROM \"Order\"");
}
