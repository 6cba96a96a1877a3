//! Per-clause comparison.
//!
//! Each clause kind has its own notion of equality: projections and GROUP BY
//! are unordered, FROM items form a set, conditions are nested AND/OR sets,
//! ORDER BY is a sequence and LIMIT is compared literally.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::condition::Condition;
use crate::ast::{JoinType, Query, SelectStatement, TableRef};
use crate::normalize::{identifier, Normalizer};

/// The comparable clause kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ClauseKind {
    /// Projection list.
    Select,
    /// FROM items and joins.
    From,
    /// WHERE condition.
    Where,
    /// GROUP BY expressions.
    GroupBy,
    /// HAVING condition.
    Having,
    /// ORDER BY items.
    OrderBy,
    /// LIMIT and OFFSET.
    Limit,
}

impl ClauseKind {
    /// Clauses that belong to a single SELECT block.
    pub const SELECT_BLOCK: [Self; 5] = [
        Self::Select,
        Self::From,
        Self::Where,
        Self::GroupBy,
        Self::Having,
    ];

    /// Clauses that belong to the enclosing query.
    pub const QUERY: [Self; 2] = [Self::OrderBy, Self::Limit];

    /// Returns the SQL keyword(s) naming the clause.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether projections are compared as a multiset or as a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Projection order is ignored.
    #[default]
    Unordered,
    /// Projection order must match.
    Ordered,
}

/// One FROM item: its source, how it is joined and on what.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FromItem {
    /// Normalized table name, or a parenthesized subquery.
    pub source: String,
    /// Join kind; `None` for the first item and comma-separated items.
    pub join: Option<JoinType>,
    /// ON condition or USING column list.
    pub condition: Option<Condition>,
}

/// A clause with its normalized content.
///
/// An absent clause is represented by an empty list or `None`, so presence
/// takes part in equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Projections and the DISTINCT flag.
    Select {
        /// Whether DISTINCT was given.
        distinct: bool,
        /// Normalized projections in source order.
        items: Vec<String>,
    },
    /// FROM items in source order.
    From(Vec<FromItem>),
    /// WHERE condition.
    Where(Option<Condition>),
    /// Normalized GROUP BY expressions.
    GroupBy(Vec<String>),
    /// HAVING condition.
    Having(Option<Condition>),
    /// Normalized ORDER BY items.
    OrderBy(Vec<String>),
    /// Normalized LIMIT and OFFSET.
    Limit {
        /// LIMIT expression.
        limit: Option<String>,
        /// OFFSET expression.
        offset: Option<String>,
    },
}

/// Why two clauses of the same kind differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClauseMismatch {
    /// One side has the clause and the other does not.
    #[error("{0} clause present in only one query")]
    Presence(ClauseKind),
    /// Both sides have the clause with different content.
    #[error("{0} clause differs")]
    Content(ClauseKind),
}

impl Clause {
    /// Extracts a clause of a SELECT block.
    ///
    /// Query-level kinds yield an absent clause.
    #[must_use]
    pub fn of_select(kind: ClauseKind, select: &SelectStatement, n: &Normalizer<'_>) -> Self {
        match kind {
            ClauseKind::Select => Self::Select {
                distinct: select.distinct,
                items: select.columns.iter().map(|c| n.projection(c)).collect(),
            },
            ClauseKind::From => {
                let mut items = Vec::new();
                for table_ref in &select.from {
                    flatten_from(table_ref, None, n, &mut items);
                }
                Self::From(items)
            }
            ClauseKind::Where => Self::Where(
                select
                    .where_clause
                    .as_ref()
                    .map(|e| Condition::from_expr(e, n)),
            ),
            ClauseKind::GroupBy => Self::GroupBy(select.group_by.iter().map(|e| n.expr(e)).collect()),
            ClauseKind::Having => {
                Self::Having(select.having.as_ref().map(|e| Condition::from_expr(e, n)))
            }
            ClauseKind::OrderBy => Self::OrderBy(Vec::new()),
            ClauseKind::Limit => Self::Limit {
                limit: None,
                offset: None,
            },
        }
    }

    /// Extracts a clause that belongs to a whole query (ORDER BY, LIMIT).
    ///
    /// SELECT-block kinds yield an absent clause.
    #[must_use]
    pub fn of_query(kind: ClauseKind, query: &Query, n: &Normalizer<'_>) -> Self {
        match kind {
            ClauseKind::OrderBy => {
                Self::OrderBy(query.order_by.iter().map(|item| n.order_by(item)).collect())
            }
            ClauseKind::Limit => Self::Limit {
                limit: query.limit.as_ref().map(|e| n.expr(e)),
                offset: query.offset.as_ref().map(|e| n.expr(e)),
            },
            ClauseKind::Select => Self::Select {
                distinct: false,
                items: Vec::new(),
            },
            ClauseKind::From => Self::From(Vec::new()),
            ClauseKind::Where => Self::Where(None),
            ClauseKind::GroupBy => Self::GroupBy(Vec::new()),
            ClauseKind::Having => Self::Having(None),
        }
    }

    /// Returns the clause kind.
    #[must_use]
    pub const fn kind(&self) -> ClauseKind {
        match self {
            Self::Select { .. } => ClauseKind::Select,
            Self::From(_) => ClauseKind::From,
            Self::Where(_) => ClauseKind::Where,
            Self::GroupBy(_) => ClauseKind::GroupBy,
            Self::Having(_) => ClauseKind::Having,
            Self::OrderBy(_) => ClauseKind::OrderBy,
            Self::Limit { .. } => ClauseKind::Limit,
        }
    }

    /// Returns whether the clause is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Select { items, .. } => !items.is_empty(),
            Self::From(items) => !items.is_empty(),
            Self::Where(condition) | Self::Having(condition) => condition.is_some(),
            Self::GroupBy(items) | Self::OrderBy(items) => !items.is_empty(),
            Self::Limit { limit, offset } => limit.is_some() || offset.is_some(),
        }
    }

    /// Compares two clauses of the same kind.
    ///
    /// # Errors
    ///
    /// Returns the mismatch if the clauses are not equivalent, including
    /// when they are of different kinds.
    pub fn compare(&self, other: &Self, mode: CompareMode) -> Result<(), ClauseMismatch> {
        let kind = self.kind();
        if self.is_present() != other.is_present() {
            return Err(ClauseMismatch::Presence(kind));
        }

        let equal = match (self, other) {
            (
                Self::Select {
                    distinct: a_distinct,
                    items: a,
                },
                Self::Select {
                    distinct: b_distinct,
                    items: b,
                },
            ) => {
                a_distinct == b_distinct
                    && match mode {
                        CompareMode::Ordered => a == b,
                        CompareMode::Unordered => sorted(a) == sorted(b),
                    }
            }
            (Self::From(a), Self::From(b)) => as_set(a) == as_set(b),
            (Self::Where(a), Self::Where(b)) | (Self::Having(a), Self::Having(b)) => a == b,
            (Self::GroupBy(a), Self::GroupBy(b)) => as_set(a) == as_set(b),
            (Self::OrderBy(a), Self::OrderBy(b)) => a == b,
            (
                Self::Limit {
                    limit: a_limit,
                    offset: a_offset,
                },
                Self::Limit {
                    limit: b_limit,
                    offset: b_offset,
                },
            ) => a_limit == b_limit && a_offset == b_offset,
            _ => false,
        };

        if equal {
            Ok(())
        } else {
            Err(ClauseMismatch::Content(kind))
        }
    }
}

fn sorted(items: &[String]) -> Vec<&String> {
    let mut items: Vec<&String> = items.iter().collect();
    items.sort();
    items
}

fn as_set<T: Ord>(items: &[T]) -> BTreeSet<&T> {
    items.iter().collect()
}

/// Flattens a join tree into FROM items.
fn flatten_from(
    table_ref: &TableRef,
    join: Option<(JoinType, Option<Condition>)>,
    n: &Normalizer<'_>,
    out: &mut Vec<FromItem>,
) {
    let (join, condition) = join.map_or((None, None), |(kind, condition)| (Some(kind), condition));
    match table_ref {
        TableRef::Table { name, alias, .. } => out.push(FromItem {
            source: table_source(name, alias.as_deref(), n),
            join,
            condition,
        }),
        TableRef::Subquery { query, .. } => out.push(FromItem {
            source: format!("({})", n.query(query)),
            join,
            condition,
        }),
        TableRef::Join { left, join: clause } => {
            flatten_from(left, None, n, out);
            let condition = match (&clause.on, clause.using.is_empty()) {
                (Some(on), _) => Some(Condition::from_expr(on, n)),
                (None, false) => {
                    let mut columns: Vec<String> =
                        clause.using.iter().map(|c| identifier(c)).collect();
                    columns.sort();
                    Some(Condition::Atom(format!("USING ({})", columns.join(", "))))
                }
                (None, true) => None,
            };
            flatten_from(&clause.table, Some((clause.join_type, condition)), n, out);
        }
    }
}

/// Renders a table reference; the alias is kept only when the structural
/// normalizer cannot fold it into the table name.
fn table_source(name: &str, alias: Option<&str>, n: &Normalizer<'_>) -> String {
    let table = identifier(name);
    match alias {
        Some(alias) => {
            let qualifier = n.qualifier(alias);
            if qualifier == table {
                table
            } else {
                format!("{table} AS {qualifier}")
            }
        }
        None => table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::dialect::GenericDialect;
    use crate::parser::Parser;
    use crate::validate::AliasMap;

    fn statement(sql: &str) -> Statement {
        Parser::new(sql, &GenericDialect::new())
            .parse_statement()
            .unwrap()
    }

    fn clause(sql: &str, kind: ClauseKind) -> Clause {
        let statement = statement(sql);
        let aliases = AliasMap::build(&statement);
        let n = Normalizer::structural(&aliases);
        let query = statement.as_query().unwrap();
        match query.as_select() {
            Some(select) if ClauseKind::SELECT_BLOCK.contains(&kind) => {
                Clause::of_select(kind, select, &n)
            }
            _ => Clause::of_query(kind, query, &n),
        }
    }

    fn same(a: &str, b: &str, kind: ClauseKind) -> bool {
        clause(a, kind)
            .compare(&clause(b, kind), CompareMode::Unordered)
            .is_ok()
    }

    #[test]
    fn test_select_list_is_unordered() {
        assert!(same("SELECT a, b FROM t", "SELECT b, a FROM t", ClauseKind::Select));
        assert!(same("SELECT b, a FROM t", "SELECT a, b FROM t", ClauseKind::Select));
        assert!(!same("SELECT a, a FROM t", "SELECT a FROM t", ClauseKind::Select));
        assert!(!same("SELECT DISTINCT a FROM t", "SELECT a FROM t", ClauseKind::Select));
    }

    #[test]
    fn test_select_list_ordered_mode() {
        let a = clause("SELECT a, b FROM t", ClauseKind::Select);
        let b = clause("SELECT b, a FROM t", ClauseKind::Select);
        assert_eq!(
            a.compare(&b, CompareMode::Ordered),
            Err(ClauseMismatch::Content(ClauseKind::Select))
        );
    }

    #[test]
    fn test_from_items_are_a_set() {
        let a = "SELECT 1 FROM a JOIN b ON a.id = b.a_id JOIN c ON c.id = a.c_id";
        let b = "SELECT 1 FROM a JOIN c ON a.c_id = c.id JOIN b ON b.a_id = a.id";
        assert!(same(a, b, ClauseKind::From));
        assert!(same(b, a, ClauseKind::From));
        assert!(!same(a, "SELECT 1 FROM a LEFT JOIN b ON a.id = b.a_id JOIN c ON c.id = a.c_id", ClauseKind::From));
    }

    #[test]
    fn test_aliases_fold_into_table_names() {
        assert!(same(
            "SELECT s.id FROM snippets s WHERE s.id > 1",
            "SELECT snippets.id FROM snippets WHERE snippets.id > 1",
            ClauseKind::Where
        ));
        assert!(same(
            "SELECT s.id FROM snippets s",
            "SELECT snippets.id FROM snippets",
            ClauseKind::From
        ));
    }

    #[test]
    fn test_where_presence_matters() {
        let a = clause("SELECT a FROM t WHERE a = 1", ClauseKind::Where);
        let b = clause("SELECT a FROM t", ClauseKind::Where);
        assert_eq!(
            a.compare(&b, CompareMode::Unordered),
            Err(ClauseMismatch::Presence(ClauseKind::Where))
        );
    }

    #[test]
    fn test_group_by_is_unordered_order_by_is_not() {
        assert!(same(
            "SELECT a, b FROM t GROUP BY a, b",
            "SELECT a, b FROM t GROUP BY b, a",
            ClauseKind::GroupBy
        ));
        assert!(!same(
            "SELECT a FROM t ORDER BY a, b",
            "SELECT a FROM t ORDER BY b, a",
            ClauseKind::OrderBy
        ));
        assert!(same(
            "SELECT a FROM t ORDER BY a ASC",
            "SELECT a FROM t ORDER BY a",
            ClauseKind::OrderBy
        ));
    }

    #[test]
    fn test_limit() {
        assert!(same("SELECT a FROM t", "SELECT a FROM t", ClauseKind::Limit));
        assert!(same("SELECT a FROM t LIMIT 5", "SELECT a FROM t LIMIT 5", ClauseKind::Limit));
        assert!(!same("SELECT a FROM t LIMIT 5", "SELECT a FROM t LIMIT 10", ClauseKind::Limit));
        assert!(!same(
            "SELECT a FROM t LIMIT 5 OFFSET 1",
            "SELECT a FROM t LIMIT 5",
            ClauseKind::Limit
        ));
    }
}
