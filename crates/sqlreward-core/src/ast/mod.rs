//! Abstract Syntax Tree (AST) types for SQL statements.

mod expression;
mod statement;
mod types;
pub mod visit;

pub use expression::{BinaryOp, Expr, FunctionCall, Literal, UnaryOp};
pub use statement::{
    Cte, DeleteStatement, InsertSource, InsertStatement, JoinClause, JoinType, NullOrdering,
    OrderBy, OrderDirection, Query, SelectColumn, SelectStatement, SetExpr, SetOperator,
    Statement, StatementKind, TableRef, UpdateAssignment, UpdateStatement, With,
};
pub use types::TypeName;
pub use visit::Visitor;
