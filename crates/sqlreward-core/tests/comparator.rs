//! Tests for normalization, clause comparison and the equivalence policies.

mod common;
use common::*;

use sqlreward_core::compare::{self, compare_exact, compare_structural, Strategy};
use sqlreward_core::metadata::{Complexity, Style};
use sqlreward_core::normalize::Normalizer;
use sqlreward_core::{select_strategy, QueryMetadata};

const QUERIES: &[&str] = &[
    "SELECT description, complexity FROM code_snippets WHERE complexity > 5 AND is_public = 1",
    "select DISTINCT a.Name , COUNT( * ) from Users a left join Orders o on a.id=o.user_id group by a.Name having count(*)>=2 order by 2 desc limit 5",
    "WITH RECURSIVE r(n) AS (SELECT 1 UNION ALL SELECT n+1 FROM r WHERE n<10) SELECT n FROM r",
    "SELECT * FROM t WHERE a NOT IN (SELECT b FROM u) OR NOT EXISTS (SELECT 1 FROM v WHERE v.x = t.x)",
    "SELECT CASE WHEN x IS NULL THEN 'none' ELSE CAST(x AS TEXT) END AS label FROM t",
    "SELECT \"select\", `from` FROM \"Weird Table\" WHERE \"select\" LIKE '%''%'",
    "(SELECT a FROM t) INTERSECT (SELECT a FROM u) ORDER BY a NULLS FIRST",
    "SELECT -(-1), +2, 3 - -4, 'a' || 'b', X'0A', 1.5e3 FROM t",
];

#[test]
fn normalization_is_idempotent() {
    let n = Normalizer::new();
    for sql in QUERIES {
        let once = n.statement(&parse(sql));
        let twice = n.statement(&parse(&once));
        assert_eq!(once, twice, "not idempotent for {sql}");
    }
}

#[test]
fn structural_comparison_is_symmetric() {
    let pairs = [
        ("SELECT a, b FROM t", "SELECT b, a FROM t"),
        ("SELECT a FROM t, u", "SELECT a FROM u, t"),
        (
            "SELECT 1 FROM a JOIN b ON a.id = b.id JOIN c ON c.id = a.id",
            "SELECT 1 FROM a JOIN c ON a.id = c.id JOIN b ON b.id = a.id",
        ),
        ("SELECT a FROM t GROUP BY a, b", "SELECT a FROM t GROUP BY b, a"),
        ("SELECT a FROM t WHERE x = 1", "SELECT a FROM t WHERE x = 2"),
    ];
    for (a, b) in pairs {
        let ab = compare_structural(&parse(a), &parse(b));
        let ba = compare_structural(&parse(b), &parse(a));
        assert_eq!(ab.matched, ba.matched, "{a} / {b}");
    }
}

#[test]
fn where_conjuncts_commute_but_not_across_or() {
    let and_ab = parse("SELECT * FROM t WHERE a = 1 AND b = 2");
    let and_ba = parse("SELECT * FROM t WHERE b = 2 AND a = 1");
    let or_ab = parse("SELECT * FROM t WHERE a = 1 OR b = 2");
    assert!(compare_structural(&and_ab, &and_ba).matched);
    let outcome = compare_structural(&and_ab, &or_ab);
    assert!(!outcome.matched);
    assert_eq!(outcome.reason.as_deref(), Some("WHERE clause differs"));
}

#[test]
fn nested_conditions_respect_parentheses() {
    let a = parse("SELECT * FROM t WHERE (a = 1 OR b = 2) AND c = 3");
    let b = parse("SELECT * FROM t WHERE c = 3 AND (b = 2 OR a = 1)");
    let c = parse("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3");
    assert!(compare_structural(&a, &b).matched);
    assert!(!compare_structural(&a, &c).matched);
}

#[test]
fn having_compares_like_where() {
    let a = parse("SELECT a, COUNT(*) FROM t GROUP BY a HAVING COUNT(*) > 1 AND MAX(b) < 5");
    let b = parse("SELECT a, count(*) FROM t GROUP BY a HAVING 5 > max(b) AND count(*) > 1");
    assert!(compare_structural(&a, &b).matched);
}

#[test]
fn join_conditions_must_agree_on_presence() {
    let a = parse("SELECT * FROM a JOIN b ON a.id = b.id");
    let b = parse("SELECT * FROM a CROSS JOIN b");
    assert_eq!(
        compare_structural(&a, &b).reason.as_deref(),
        Some("FROM clause differs")
    );
}

#[test]
fn scenario_c_join_and_conjunct_order() {
    let candidate = "SELECT u.name, c.description FROM users u \
                     JOIN code_snippets c ON c.owner_id = u.user_id \
                     JOIN snippet_tags t ON t.snippet_id = c.snippet_id \
                     WHERE t.tag = 'rust' AND c.is_public = 1";
    let reference = "SELECT users.name, code_snippets.description FROM users \
                     JOIN snippet_tags ON snippet_tags.snippet_id = code_snippets.snippet_id \
                     JOIN code_snippets ON users.user_id = code_snippets.owner_id \
                     WHERE code_snippets.is_public = 1 AND snippet_tags.tag = 'rust'";
    let metadata = QueryMetadata::new()
        .complexity(Complexity::Moderate)
        .style(Style::Colloquial);

    // Plain text comparison would reject the pair.
    assert!(!compare_exact(&parse(candidate), &parse(reference)).matched);

    let outcome = compare::compare(
        &parsed(candidate),
        reference,
        Some(&parsed(reference)),
        &metadata,
        None,
    );
    assert_eq!(outcome.strategy, Strategy::Structural);
    assert!(outcome.matched, "{:?}", outcome.reason);
}

#[test]
fn exact_policy_keeps_projection_order() {
    let metadata = QueryMetadata::new().style(Style::Imperative);
    let outcome = compare::compare(
        &parsed("SELECT b, a FROM t"),
        "SELECT a, b FROM t",
        Some(&parsed("SELECT a, b FROM t")),
        &metadata,
        None,
    );
    assert_eq!(outcome.strategy, Strategy::Exact);
    assert!(!outcome.matched);
}

#[test]
fn unparseable_reference_is_a_mismatch() {
    let outcome = compare::compare(
        &parsed("SELECT a FROM t"),
        "SELEC a FROM t",
        None,
        &QueryMetadata::new(),
        None,
    );
    assert!(!outcome.matched);
    assert_eq!(outcome.reason.as_deref(), Some("reference query does not parse"));
}

#[test]
fn policy_selector_is_total() {
    let complexities = [
        None,
        Some(Complexity::Simple),
        Some(Complexity::Moderate),
        Some(Complexity::Complex),
    ];
    let styles = [
        None,
        Some(Style::Vague),
        Some(Style::Colloquial),
        Some(Style::Imperative),
    ];
    for complexity in complexities {
        for style in styles {
            let metadata = QueryMetadata {
                complexity,
                style,
                db_id: None,
            };
            for connected in [false, true] {
                let strategy = select_strategy(&metadata, connected);
                assert!(matches!(
                    strategy,
                    Strategy::Exact | Strategy::Structural | Strategy::Execution
                ));
                assert_eq!(strategy == Strategy::Execution, connected);
            }
        }
    }
}

#[test]
fn outcome_serializes() {
    let outcome = compare_structural(&parse("SELECT a FROM t"), &parse("SELECT b FROM t"));
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({
            "matched": false,
            "strategy": "structural",
            "reason": "SELECT clause differs"
        })
    );
}
