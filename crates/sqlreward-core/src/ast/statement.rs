//! SQL statement AST types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::expression::Expr;

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Null ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// NULLs come first.
    First,
    /// NULLs come last.
    Last,
}

impl NullOrdering {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
    /// Null ordering (optional).
    pub nulls: Option<NullOrdering>,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JoinType {
    /// INNER JOIN (or plain JOIN).
    Inner,
    /// LEFT OUTER JOIN.
    Left,
    /// RIGHT OUTER JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
    /// CROSS JOIN.
    Cross,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// The table to join.
    pub table: TableRef,
    /// The join condition (for non-CROSS joins).
    pub on: Option<Expr>,
    /// USING columns (alternative to ON).
    pub using: Vec<String>,
}

/// A table reference in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A named table (or CTE).
    Table {
        /// Schema name (optional).
        schema: Option<String>,
        /// Table name.
        name: String,
        /// Alias.
        alias: Option<String>,
    },
    /// A derived table.
    Subquery {
        /// The subquery.
        query: Box<Query>,
        /// Alias.
        alias: Option<String>,
    },
    /// A joined table.
    Join {
        /// Left side of the join.
        left: Box<TableRef>,
        /// The join clause.
        join: Box<JoinClause>,
    },
}

impl TableRef {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Adds an alias to this table reference.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            Self::Table { schema, name, .. } => Self::Table {
                schema,
                name,
                alias: Some(alias.into()),
            },
            Self::Subquery { query, .. } => Self::Subquery {
                query,
                alias: Some(alias.into()),
            },
            Self::Join { left, join } => Self::Join {
                left: Box::new((*left).alias(alias)),
                join,
            },
        }
    }
}

/// A column in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// The expression.
    pub expr: Expr,
    /// Column alias.
    pub alias: Option<String>,
}

/// A single SELECT block (no ORDER BY/LIMIT; those belong to [`Query`]).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Whether to select DISTINCT values.
    pub distinct: bool,
    /// The columns to select.
    pub columns: Vec<SelectColumn>,
    /// FROM items; comma-separated items are listed in order, empty if absent.
    pub from: Vec<TableRef>,
    /// The WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// HAVING clause.
    pub having: Option<Expr>,
}

/// Set operators combining query bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// UNION
    Union,
    /// INTERSECT
    Intersect,
    /// EXCEPT
    Except,
}

impl SetOperator {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// The body of a query: a SELECT block or a tree of set operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    /// A single SELECT block.
    Select(Box<SelectStatement>),
    /// A parenthesized query used as an operand.
    Query(Box<Query>),
    /// `left <op> [ALL] right`.
    SetOperation {
        /// The operator.
        op: SetOperator,
        /// Whether ALL was specified.
        all: bool,
        /// Left operand.
        left: Box<SetExpr>,
        /// Right operand.
        right: Box<SetExpr>,
    },
}

/// A common table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// Name the CTE is referenced by.
    pub name: String,
    /// Optional column list.
    pub columns: Vec<String>,
    /// The CTE body.
    pub query: Box<Query>,
}

/// A WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    /// Whether RECURSIVE was specified.
    pub recursive: bool,
    /// The CTEs, in declaration order.
    pub ctes: Vec<Cte>,
}

/// A full query: optional WITH, a body, and trailing ORDER BY/LIMIT/OFFSET.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// WITH clause.
    pub with: Option<With>,
    /// The query body.
    pub body: SetExpr,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT clause.
    pub limit: Option<Expr>,
    /// OFFSET clause.
    pub offset: Option<Expr>,
}

impl Query {
    /// Wraps a single SELECT block into a query.
    #[must_use]
    pub fn select(select: SelectStatement) -> Self {
        Self {
            with: None,
            body: SetExpr::Select(Box::new(select)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Returns the SELECT block if the body is a single SELECT.
    #[must_use]
    pub fn as_select(&self) -> Option<&SelectStatement> {
        match &self.body {
            SetExpr::Select(select) => Some(select),
            _ => None,
        }
    }
}

/// Source of data for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// VALUES (...), (...), ...
    Values(Vec<Vec<Expr>>),
    /// A query.
    Query(Box<Query>),
    /// DEFAULT VALUES
    DefaultValues,
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Table name.
    pub table: String,
    /// Column names (optional).
    pub columns: Vec<String>,
    /// Values to insert.
    pub source: InsertSource,
}

/// An assignment in UPDATE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    /// Column name.
    pub column: String,
    /// Value expression.
    pub value: Expr,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Table name.
    pub table: String,
    /// Alias.
    pub alias: Option<String>,
    /// SET assignments.
    pub assignments: Vec<UpdateAssignment>,
    /// FROM items (for joins in UPDATE).
    pub from: Vec<TableRef>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Table name.
    pub table: String,
    /// Alias.
    pub alias: Option<String>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A query (SELECT, set operation, or WITH ... SELECT).
    Query(Box<Query>),
    /// INSERT statement.
    Insert(InsertStatement),
    /// UPDATE statement.
    Update(UpdateStatement),
    /// DELETE statement.
    Delete(DeleteStatement),
}

impl Statement {
    /// Returns the kind used by statement allowlists.
    #[must_use]
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Query(query) if query.with.is_some() => StatementKind::With,
            Self::Query(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
        }
    }

    /// Returns the query if this is a query statement.
    #[must_use]
    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Self::Query(query) => Some(query),
            _ => None,
        }
    }
}

/// Statement kinds, as named in statement allowlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    /// A query without a WITH clause.
    Select,
    /// A query with a WITH clause.
    With,
    /// INSERT
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// CREATE, DROP or ALTER; never parsed, always rejected.
    Ddl,
}

impl StatementKind {
    /// Returns the SQL keyword naming this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::With => "WITH",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Ddl => "DDL",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type() {
        assert_eq!(JoinType::Inner.as_str(), "INNER JOIN");
        assert_eq!(JoinType::Left.as_str(), "LEFT JOIN");
    }

    #[test]
    fn test_table_ref_builder() {
        let table = TableRef::table("users").alias("u");
        assert!(
            matches!(table, TableRef::Table { name, alias, .. } if name == "users" && alias == Some(String::from("u")))
        );
    }

    #[test]
    fn test_statement_kind() {
        let plain = Statement::Query(Box::new(Query::select(SelectStatement::default())));
        assert_eq!(plain.kind(), StatementKind::Select);

        let mut with = Query::select(SelectStatement::default());
        with.with = Some(With {
            recursive: false,
            ctes: Vec::new(),
        });
        assert_eq!(Statement::Query(Box::new(with)).kind(), StatementKind::With);
    }

    #[test]
    fn test_statement_kind_serde_names() {
        let kind: StatementKind = serde_json::from_str("\"WITH\"").unwrap();
        assert_eq!(kind, StatementKind::With);
        assert_eq!(StatementKind::Select.to_string(), "SELECT");
    }
}
