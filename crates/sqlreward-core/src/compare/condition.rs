//! Boolean conditions as nested AND/OR sets.

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::{BinaryOp, Expr};
use crate::normalize::Normalizer;

/// A WHERE or HAVING condition split on its top-level AND/OR boundaries.
///
/// Parentheses only group; `(a AND b) AND c` flattens to one conjunction.
/// `a AND b` and `b AND a` are equal, `a AND b` and `a OR b` are not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Condition {
    /// Conjunction of two or more conditions.
    All(BTreeSet<Condition>),
    /// Disjunction of two or more conditions.
    Any(BTreeSet<Condition>),
    /// Any other predicate, in normalized text form.
    Atom(String),
}

impl Condition {
    /// Builds a condition from an expression.
    #[must_use]
    pub fn from_expr(expr: &Expr, normalizer: &Normalizer<'_>) -> Self {
        let expr = expr.unparenthesized();
        match expr {
            Expr::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                ..
            } => {
                let mut operands = Vec::new();
                flatten(expr, *op, &mut operands);
                let mut set: BTreeSet<Self> = operands
                    .into_iter()
                    .map(|operand| Self::from_expr(operand, normalizer))
                    .collect();
                // `a AND a` is just `a`.
                if set.len() == 1 {
                    if let Some(only) = set.pop_first() {
                        return only;
                    }
                }
                if *op == BinaryOp::And {
                    Self::All(set)
                } else {
                    Self::Any(set)
                }
            }
            _ => Self::Atom(normalizer.expr(expr)),
        }
    }
}

/// Collects the operands of a chain of `op`, looking through parentheses.
fn flatten<'e>(expr: &'e Expr, op: BinaryOp, out: &mut Vec<&'e Expr>) {
    match expr.unparenthesized() {
        Expr::Binary {
            left,
            op: inner,
            right,
        } if *inner == op => {
            flatten(left, op, out);
            flatten(right, op, out);
        }
        other => out.push(other),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (set, joiner) = match self {
            Self::Atom(text) => return f.write_str(text),
            Self::All(set) => (set, " AND "),
            Self::Any(set) => (set, " OR "),
        };
        for (i, item) in set.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            match item {
                Self::Atom(text) => f.write_str(text)?,
                nested => write!(f, "({nested})")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use crate::parser::Parser;

    fn condition(sql: &str) -> Condition {
        let statement = Parser::new(&format!("SELECT * FROM t WHERE {sql}"), &GenericDialect::new())
            .parse_statement()
            .unwrap();
        let select = statement.as_query().unwrap().as_select().unwrap();
        Condition::from_expr(select.where_clause.as_ref().unwrap(), &Normalizer::new())
    }

    #[test]
    fn test_and_is_commutative() {
        assert_eq!(condition("a = 1 AND b = 2"), condition("b = 2 AND a = 1"));
    }

    #[test]
    fn test_and_differs_from_or() {
        assert_ne!(condition("a = 1 AND b = 2"), condition("a = 1 OR b = 2"));
    }

    #[test]
    fn test_parentheses_are_respected() {
        assert_eq!(
            condition("(a = 1 AND b = 2) AND c = 3"),
            condition("a = 1 AND (c = 3 AND b = 2)")
        );
        assert_ne!(
            condition("a = 1 AND (b = 2 OR c = 3)"),
            condition("(a = 1 AND b = 2) OR c = 3")
        );
    }

    #[test]
    fn test_single_parenthesized_atom() {
        assert_eq!(condition("((a = 1))"), Condition::Atom(String::from("a = 1")));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            condition("b = 2 AND (d = 4 OR c = 3)").to_string(),
            "(c = 3 OR d = 4) AND b = 2"
        );
    }
}
