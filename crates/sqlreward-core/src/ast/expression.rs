//! Expression AST types.

use super::statement::Query;
use super::types::TypeName;
use crate::lexer::Span;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Blob literal.
    Blob(Vec<u8>),
    /// Boolean literal.
    Boolean(bool),
    /// NULL literal.
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // String
    Concat,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
        }
    }

    /// Returns the operator obtained by swapping the operands, if the
    /// operator is a comparison (`a < b` is `b > a`).
    #[must_use]
    pub const fn mirrored(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::NotEq => Some(Self::NotEq),
            Self::Lt => Some(Self::Gt),
            Self::LtEq => Some(Self::GtEq),
            Self::Gt => Some(Self::Lt),
            Self::GtEq => Some(Self::LtEq),
            _ => None,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "NOT",
        }
    }
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name as written.
    pub name: String,
    /// The arguments; `COUNT(*)` carries a single [`Expr::Wildcard`].
    pub args: Vec<Expr>,
    /// Whether DISTINCT was specified.
    pub distinct: bool,
}

/// An SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),

    /// A column reference (optionally qualified with a table name or alias).
    Column {
        /// Table name or alias (optional).
        table: Option<String>,
        /// Column name.
        name: String,
        /// Source span.
        span: Span,
    },

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },

    /// A function call.
    Function(FunctionCall),

    /// A scalar subquery.
    Subquery(Box<Query>),

    /// `[NOT] EXISTS (subquery)`.
    Exists {
        /// The subquery.
        query: Box<Query>,
        /// Whether this is NOT EXISTS.
        negated: bool,
    },

    /// IS NULL expression.
    IsNull {
        /// The expression to check.
        expr: Box<Expr>,
        /// Whether this is IS NOT NULL.
        negated: bool,
    },

    /// `[NOT] IN (a, b, ...)`.
    InList {
        /// The expression to check.
        expr: Box<Expr>,
        /// The list of values.
        list: Vec<Expr>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// `[NOT] IN (subquery)`.
    InSubquery {
        /// The expression to check.
        expr: Box<Expr>,
        /// The subquery.
        query: Box<Query>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// BETWEEN expression.
    Between {
        /// The expression to check.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// Whether this is NOT BETWEEN.
        negated: bool,
    },

    /// `[NOT] LIKE pattern`.
    Like {
        /// The expression to match.
        expr: Box<Expr>,
        /// The pattern.
        pattern: Box<Expr>,
        /// Whether this is NOT LIKE.
        negated: bool,
    },

    /// CASE expression.
    Case {
        /// The operand (if any).
        operand: Option<Box<Expr>>,
        /// WHEN/THEN clauses.
        when_clauses: Vec<(Expr, Expr)>,
        /// ELSE clause.
        else_clause: Option<Box<Expr>>,
    },

    /// CAST expression.
    Cast {
        /// Expression to cast.
        expr: Box<Expr>,
        /// Target type.
        data_type: TypeName,
    },

    /// Parenthesized expression.
    Paren(Box<Expr>),

    /// A `?` parameter placeholder (1-based position).
    Parameter {
        /// Position in the statement.
        position: usize,
    },

    /// Wildcard (`*` or `t.*`).
    Wildcard {
        /// Table qualifier (optional).
        table: Option<String>,
    },
}

impl Expr {
    /// Creates a new column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Creates a new qualified column reference.
    #[must_use]
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Creates a new integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Strips any number of enclosing parentheses.
    #[must_use]
    pub fn unparenthesized(&self) -> &Self {
        let mut expr = self;
        while let Self::Paren(inner) = expr {
            expr = inner;
        }
        expr
    }
}
