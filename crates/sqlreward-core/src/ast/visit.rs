//! Depth-first traversal over statements.
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to keep descending. Every hook takes shared references;
//! traversal never mutates the tree.

use super::expression::Expr;
use super::statement::{InsertSource, Query, SelectStatement, SetExpr, Statement, TableRef};

/// Hooks called while walking a statement.
pub trait Visitor {
    /// Called for the top-level statement.
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    /// Called for every query, including CTE bodies and subqueries.
    fn visit_query(&mut self, query: &Query) {
        walk_query(self, query);
    }

    /// Called for every query body node.
    fn visit_set_expr(&mut self, set_expr: &SetExpr) {
        walk_set_expr(self, set_expr);
    }

    /// Called for every SELECT block.
    fn visit_select(&mut self, select: &SelectStatement) {
        walk_select(self, select);
    }

    /// Called for every FROM item, including join operands.
    fn visit_table_ref(&mut self, table_ref: &TableRef) {
        walk_table_ref(self, table_ref);
    }

    /// Called for every expression node.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visits the parts of a statement.
pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Query(query) => visitor.visit_query(query),
        Statement::Insert(insert) => match &insert.source {
            InsertSource::Values(rows) => {
                for expr in rows.iter().flatten() {
                    visitor.visit_expr(expr);
                }
            }
            InsertSource::Query(query) => visitor.visit_query(query),
            InsertSource::DefaultValues => {}
        },
        Statement::Update(update) => {
            for table_ref in &update.from {
                visitor.visit_table_ref(table_ref);
            }
            for assignment in &update.assignments {
                visitor.visit_expr(&assignment.value);
            }
            if let Some(expr) = &update.where_clause {
                visitor.visit_expr(expr);
            }
        }
        Statement::Delete(delete) => {
            if let Some(expr) = &delete.where_clause {
                visitor.visit_expr(expr);
            }
        }
    }
}

/// Visits CTE bodies, the body, then ORDER BY/LIMIT/OFFSET expressions.
pub fn walk_query<V: Visitor + ?Sized>(visitor: &mut V, query: &Query) {
    if let Some(with) = &query.with {
        for cte in &with.ctes {
            visitor.visit_query(&cte.query);
        }
    }
    visitor.visit_set_expr(&query.body);
    for item in &query.order_by {
        visitor.visit_expr(&item.expr);
    }
    if let Some(expr) = &query.limit {
        visitor.visit_expr(expr);
    }
    if let Some(expr) = &query.offset {
        visitor.visit_expr(expr);
    }
}

/// Visits the SELECT blocks and nested queries of a query body.
pub fn walk_set_expr<V: Visitor + ?Sized>(visitor: &mut V, set_expr: &SetExpr) {
    match set_expr {
        SetExpr::Select(select) => visitor.visit_select(select),
        SetExpr::Query(query) => visitor.visit_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            visitor.visit_set_expr(left);
            visitor.visit_set_expr(right);
        }
    }
}

/// Visits FROM items first, then projections, WHERE, GROUP BY and HAVING.
pub fn walk_select<V: Visitor + ?Sized>(visitor: &mut V, select: &SelectStatement) {
    for table_ref in &select.from {
        visitor.visit_table_ref(table_ref);
    }
    for column in &select.columns {
        visitor.visit_expr(&column.expr);
    }
    if let Some(expr) = &select.where_clause {
        visitor.visit_expr(expr);
    }
    for expr in &select.group_by {
        visitor.visit_expr(expr);
    }
    if let Some(expr) = &select.having {
        visitor.visit_expr(expr);
    }
}

/// Visits derived tables, join operands and join conditions.
pub fn walk_table_ref<V: Visitor + ?Sized>(visitor: &mut V, table_ref: &TableRef) {
    match table_ref {
        TableRef::Table { .. } => {}
        TableRef::Subquery { query, .. } => visitor.visit_query(query),
        TableRef::Join { left, join } => {
            visitor.visit_table_ref(left);
            visitor.visit_table_ref(&join.table);
            if let Some(on) = &join.on {
                visitor.visit_expr(on);
            }
        }
    }
}

/// Visits the children of an expression, descending into subqueries.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(_) | Expr::Column { .. } | Expr::Parameter { .. } | Expr::Wildcard { .. } => {}
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Function(call) => {
            for arg in &call.args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Subquery(query) | Expr::Exists { query, .. } => visitor.visit_query(query),
        Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } | Expr::Paren(expr) => {
            visitor.visit_expr(expr);
        }
        Expr::InList { expr, list, .. } => {
            visitor.visit_expr(expr);
            for item in list {
                visitor.visit_expr(item);
            }
        }
        Expr::InSubquery { expr, query, .. } => {
            visitor.visit_expr(expr);
            visitor.visit_query(query);
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            visitor.visit_expr(expr);
            visitor.visit_expr(low);
            visitor.visit_expr(high);
        }
        Expr::Like { expr, pattern, .. } => {
            visitor.visit_expr(expr);
            visitor.visit_expr(pattern);
        }
        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            if let Some(operand) = operand {
                visitor.visit_expr(operand);
            }
            for (condition, result) in when_clauses {
                visitor.visit_expr(condition);
                visitor.visit_expr(result);
            }
            if let Some(else_clause) = else_clause {
                visitor.visit_expr(else_clause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, SelectColumn};

    #[derive(Default)]
    struct ColumnCounter {
        columns: usize,
        queries: usize,
    }

    impl Visitor for ColumnCounter {
        fn visit_query(&mut self, query: &Query) {
            self.queries += 1;
            walk_query(self, query);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr, Expr::Column { .. }) {
                self.columns += 1;
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_descends_into_subqueries() {
        let inner = Query::select(SelectStatement {
            columns: vec![SelectColumn {
                expr: Expr::column("b"),
                alias: None,
            }],
            ..SelectStatement::default()
        });
        let outer = Query::select(SelectStatement {
            columns: vec![SelectColumn {
                expr: Expr::column("a"),
                alias: None,
            }],
            where_clause: Some(Expr::column("a").binary(BinaryOp::Eq, Expr::Subquery(Box::new(inner)))),
            ..SelectStatement::default()
        });

        let mut counter = ColumnCounter::default();
        counter.visit_statement(&Statement::Query(Box::new(outer)));
        assert_eq!(counter.columns, 3);
        assert_eq!(counter.queries, 2);
    }
}
