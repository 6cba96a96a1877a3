//! Canonical text rendering of statements and expressions.
//!
//! Keywords are upper-cased, identifiers lower-cased, literals kept as written
//! and whitespace collapsed to single spaces. Identifiers that would not
//! re-lex as plain names are double-quoted, so rendering a parse of the output
//! reproduces the output.

use std::fmt::Write;

use crate::ast::{
    Expr, InsertSource, JoinClause, Literal, OrderBy, OrderDirection, Query, SelectColumn,
    SelectStatement, SetExpr, Statement, TableRef, UnaryOp,
};
use crate::dialect::Dialect;
use crate::lexer::Keyword;
use crate::parser::{ParseError, Parser};
use crate::validate::AliasMap;

/// Renders AST nodes as canonical SQL text.
///
/// A plain normalizer renders the tree as-is. A structural normalizer also
/// rewrites column qualifiers through an [`AliasMap`] and puts comparison
/// operands in a fixed order, so `s.id = 1` and `1 = snippets.id` render
/// alike when `s` aliases `snippets`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer<'a> {
    aliases: Option<&'a AliasMap>,
}

impl<'a> Normalizer<'a> {
    /// Creates a plain normalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self { aliases: None }
    }

    /// Creates a normalizer that resolves qualifiers through `aliases` and
    /// canonicalizes comparison operands.
    #[must_use]
    pub const fn structural(aliases: &'a AliasMap) -> Self {
        Self {
            aliases: Some(aliases),
        }
    }

    /// Renders a statement.
    #[must_use]
    pub fn statement(&self, statement: &Statement) -> String {
        let mut out = String::new();
        self.write_statement(&mut out, statement);
        out
    }

    /// Renders a query.
    #[must_use]
    pub fn query(&self, query: &Query) -> String {
        let mut out = String::new();
        self.write_query(&mut out, query);
        out
    }

    /// Renders an expression.
    #[must_use]
    pub fn expr(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }

    /// Renders a projection, without its output alias.
    #[must_use]
    pub fn projection(&self, column: &SelectColumn) -> String {
        self.expr(&column.expr)
    }

    /// Renders an ORDER BY item, omitting the default `ASC`.
    #[must_use]
    pub fn order_by(&self, item: &OrderBy) -> String {
        let mut out = String::new();
        self.write_order_by(&mut out, item);
        out
    }

    /// Renders a column qualifier.
    #[must_use]
    pub fn qualifier(&self, qualifier: &str) -> String {
        let name = self
            .aliases
            .map_or_else(|| qualifier.to_ascii_lowercase(), |a| a.canonical_qualifier(qualifier));
        identifier(&name)
    }

    // ====================================================================
    // Statements
    // ====================================================================

    fn write_statement(&self, out: &mut String, statement: &Statement) {
        match statement {
            Statement::Query(query) => self.write_query(out, query),
            Statement::Insert(insert) => {
                let _ = write!(out, "INSERT INTO {}", identifier(&insert.table));
                if !insert.columns.is_empty() {
                    let _ = write!(out, " ({})", identifier_list(&insert.columns));
                }
                match &insert.source {
                    InsertSource::Values(rows) => {
                        out.push_str(" VALUES ");
                        for (i, row) in rows.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            out.push('(');
                            self.write_list(out, row);
                            out.push(')');
                        }
                    }
                    InsertSource::Query(query) => {
                        out.push(' ');
                        self.write_query(out, query);
                    }
                    InsertSource::DefaultValues => out.push_str(" DEFAULT VALUES"),
                }
            }
            Statement::Update(update) => {
                let _ = write!(out, "UPDATE {}", identifier(&update.table));
                write_alias(out, update.alias.as_deref());
                out.push_str(" SET ");
                for (i, assignment) in update.assignments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{} = ", identifier(&assignment.column));
                    self.write_expr(out, &assignment.value);
                }
                self.write_from(out, &update.from);
                self.write_condition(out, " WHERE ", update.where_clause.as_ref());
            }
            Statement::Delete(delete) => {
                let _ = write!(out, "DELETE FROM {}", identifier(&delete.table));
                write_alias(out, delete.alias.as_deref());
                self.write_condition(out, " WHERE ", delete.where_clause.as_ref());
            }
        }
    }

    fn write_query(&self, out: &mut String, query: &Query) {
        if let Some(with) = &query.with {
            out.push_str("WITH ");
            if with.recursive {
                out.push_str("RECURSIVE ");
            }
            for (i, cte) in with.ctes.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&identifier(&cte.name));
                if !cte.columns.is_empty() {
                    let _ = write!(out, " ({})", identifier_list(&cte.columns));
                }
                out.push_str(" AS (");
                self.write_query(out, &cte.query);
                out.push(')');
            }
            out.push(' ');
        }

        self.write_set_expr(out, &query.body);

        if !query.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, item) in query.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_order_by(out, item);
            }
        }
        self.write_condition(out, " LIMIT ", query.limit.as_ref());
        self.write_condition(out, " OFFSET ", query.offset.as_ref());
    }

    fn write_set_expr(&self, out: &mut String, set_expr: &SetExpr) {
        match set_expr {
            SetExpr::Select(select) => self.write_select(out, select),
            SetExpr::Query(query) => {
                out.push('(');
                self.write_query(out, query);
                out.push(')');
            }
            SetExpr::SetOperation {
                op,
                all,
                left,
                right,
            } => {
                self.write_set_expr(out, left);
                let _ = write!(out, " {}{} ", op.as_str(), if *all { " ALL" } else { "" });
                self.write_set_expr(out, right);
            }
        }
    }

    fn write_select(&self, out: &mut String, select: &SelectStatement) {
        out.push_str("SELECT ");
        if select.distinct {
            out.push_str("DISTINCT ");
        }
        for (i, column) in select.columns.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_expr(out, &column.expr);
            if let Some(alias) = &column.alias {
                let _ = write!(out, " AS {}", identifier(alias));
            }
        }
        self.write_from(out, &select.from);
        self.write_condition(out, " WHERE ", select.where_clause.as_ref());
        if !select.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            self.write_list(out, &select.group_by);
        }
        self.write_condition(out, " HAVING ", select.having.as_ref());
    }

    fn write_from(&self, out: &mut String, from: &[TableRef]) {
        if from.is_empty() {
            return;
        }
        out.push_str(" FROM ");
        for (i, table_ref) in from.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_table_ref(out, table_ref);
        }
    }

    fn write_table_ref(&self, out: &mut String, table_ref: &TableRef) {
        match table_ref {
            TableRef::Table {
                schema,
                name,
                alias,
            } => {
                if let Some(schema) = schema {
                    let _ = write!(out, "{}.", identifier(schema));
                }
                out.push_str(&identifier(name));
                write_alias(out, alias.as_deref());
            }
            TableRef::Subquery { query, alias } => {
                out.push('(');
                self.write_query(out, query);
                out.push(')');
                write_alias(out, alias.as_deref());
            }
            TableRef::Join { left, join } => {
                self.write_table_ref(out, left);
                out.push(' ');
                self.write_join(out, join);
            }
        }
    }

    /// Writes `<JOIN TYPE> <table> [ON ... | USING (...)]`.
    pub(crate) fn write_join(&self, out: &mut String, join: &JoinClause) {
        out.push_str(join.join_type.as_str());
        out.push(' ');
        // Parenthesize nested joins on the right so they re-parse the same way.
        if matches!(join.table, TableRef::Join { .. }) {
            out.push('(');
            self.write_table_ref(out, &join.table);
            out.push(')');
        } else {
            self.write_table_ref(out, &join.table);
        }
        if let Some(on) = &join.on {
            out.push_str(" ON ");
            self.write_expr(out, on);
        }
        if !join.using.is_empty() {
            let _ = write!(out, " USING ({})", identifier_list(&join.using));
        }
    }

    fn write_order_by(&self, out: &mut String, item: &OrderBy) {
        self.write_expr(out, &item.expr);
        if item.direction == OrderDirection::Desc {
            out.push_str(" DESC");
        }
        if let Some(nulls) = item.nulls {
            out.push(' ');
            out.push_str(nulls.as_str());
        }
    }

    fn write_condition(&self, out: &mut String, keyword: &str, expr: Option<&Expr>) {
        if let Some(expr) = expr {
            out.push_str(keyword);
            self.write_expr(out, expr);
        }
    }

    // ====================================================================
    // Expressions
    // ====================================================================

    fn write_list(&self, out: &mut String, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_expr(out, expr);
        }
    }

    fn write_expr(&self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Literal(literal) => write_literal(out, literal),
            Expr::Column { table, name, .. } => {
                if let Some(table) = table {
                    out.push_str(&self.qualifier(table));
                    out.push('.');
                }
                out.push_str(&identifier(name));
            }
            Expr::Binary { left, op, right } => {
                let mut lhs = self.expr(left);
                let mut rhs = self.expr(right);
                let mut op = *op;
                if self.aliases.is_some() {
                    if let Some(mirrored) = op.mirrored() {
                        if lhs > rhs {
                            std::mem::swap(&mut lhs, &mut rhs);
                            op = mirrored;
                        }
                    }
                }
                let _ = write!(out, "{lhs} {} {rhs}", op.as_str());
            }
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                out.push_str(op.as_str());
                // `- -a` must not collapse into a `--` comment.
                if *op == UnaryOp::Not || operand.starts_with('-') {
                    out.push(' ');
                }
                out.push_str(&operand);
            }
            Expr::Function(call) => {
                let _ = write!(out, "{}(", call.name.to_ascii_uppercase());
                if call.distinct {
                    out.push_str("DISTINCT ");
                }
                self.write_list(out, &call.args);
                out.push(')');
            }
            Expr::Subquery(query) => {
                out.push('(');
                self.write_query(out, query);
                out.push(')');
            }
            Expr::Exists { query, negated } => {
                out.push_str(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                self.write_query(out, query);
                out.push(')');
            }
            Expr::IsNull { expr, negated } => {
                self.write_expr(out, expr);
                out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                self.write_expr(out, expr);
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.write_list(out, list);
                out.push(')');
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                self.write_expr(out, expr);
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.write_query(out, query);
                out.push(')');
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.write_expr(out, expr);
                out.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                self.write_expr(out, low);
                out.push_str(" AND ");
                self.write_expr(out, high);
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                self.write_expr(out, expr);
                out.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                self.write_expr(out, pattern);
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                out.push_str("CASE");
                if let Some(operand) = operand {
                    out.push(' ');
                    self.write_expr(out, operand);
                }
                for (condition, result) in when_clauses {
                    out.push_str(" WHEN ");
                    self.write_expr(out, condition);
                    out.push_str(" THEN ");
                    self.write_expr(out, result);
                }
                if let Some(else_clause) = else_clause {
                    out.push_str(" ELSE ");
                    self.write_expr(out, else_clause);
                }
                out.push_str(" END");
            }
            Expr::Cast { expr, data_type } => {
                out.push_str("CAST(");
                self.write_expr(out, expr);
                let _ = write!(out, " AS {data_type})");
            }
            Expr::Paren(inner) => {
                out.push('(');
                self.write_expr(out, inner);
                out.push(')');
            }
            Expr::Parameter { .. } => out.push('?'),
            Expr::Wildcard { table } => {
                if let Some(table) = table {
                    out.push_str(&self.qualifier(table));
                    out.push('.');
                }
                out.push('*');
            }
        }
    }
}

/// Parses `sql` and renders it in canonical form.
///
/// # Errors
///
/// Returns the parse error if `sql` is not a single valid statement.
pub fn normalize_sql(sql: &str, dialect: &dyn Dialect) -> Result<String, ParseError> {
    let statement = Parser::new(sql, dialect).parse_statement()?;
    Ok(Normalizer::new().statement(&statement))
}

/// Renders an identifier lower-cased, quoting it when it would not re-lex as
/// a plain name.
#[must_use]
pub fn identifier(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        && Keyword::from_str(&name).is_none();
    if plain {
        name
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn identifier_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| identifier(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_alias(out: &mut String, alias: Option<&str>) {
    if let Some(alias) = alias {
        let _ = write!(out, " AS {}", identifier(alias));
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Integer(n) => {
            let _ = write!(out, "{n}");
        }
        // Debug keeps a fractional part or exponent so the value re-lexes as a float.
        Literal::Float(f) => {
            let _ = write!(out, "{f:?}");
        }
        Literal::String(s) => {
            let _ = write!(out, "'{}'", s.replace('\'', "''"));
        }
        Literal::Blob(bytes) => {
            out.push_str("X'");
            for byte in bytes {
                let _ = write!(out, "{byte:02X}");
            }
            out.push('\'');
        }
        Literal::Boolean(true) => out.push_str("TRUE"),
        Literal::Boolean(false) => out.push_str("FALSE"),
        Literal::Null => out.push_str("NULL"),
    }
}
