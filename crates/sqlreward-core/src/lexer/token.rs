//! Token types for the SQL lexer.

use super::Span;

/// SQL keywords recognized by the lexer.
///
/// Function names such as `COUNT` or `COALESCE` are deliberately not keywords;
/// they lex as identifiers and parse as ordinary function calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Queries
    Select,
    From,
    Where,
    Order,
    By,
    Group,
    Having,
    Limit,
    Offset,
    Distinct,
    All,
    With,
    Recursive,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,
    Using,

    // Set operations
    Union,
    Intersect,
    Except,

    // Data manipulation
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Default,

    // Data definition (recognized only to be rejected)
    Create,
    Drop,
    Alter,

    // Logical operators and predicates
    And,
    Or,
    Not,
    In,
    Between,
    Like,
    Is,
    Null,
    True,
    False,
    Exists,

    // Ordering
    Asc,
    Desc,
    Nulls,
    First,
    Last,

    // Expressions
    As,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let keyword = match s.to_ascii_uppercase().as_str() {
            "SELECT" => Self::Select,
            "FROM" => Self::From,
            "WHERE" => Self::Where,
            "ORDER" => Self::Order,
            "BY" => Self::By,
            "GROUP" => Self::Group,
            "HAVING" => Self::Having,
            "LIMIT" => Self::Limit,
            "OFFSET" => Self::Offset,
            "DISTINCT" => Self::Distinct,
            "ALL" => Self::All,
            "WITH" => Self::With,
            "RECURSIVE" => Self::Recursive,
            "JOIN" => Self::Join,
            "INNER" => Self::Inner,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            "FULL" => Self::Full,
            "OUTER" => Self::Outer,
            "CROSS" => Self::Cross,
            "ON" => Self::On,
            "USING" => Self::Using,
            "UNION" => Self::Union,
            "INTERSECT" => Self::Intersect,
            "EXCEPT" => Self::Except,
            "INSERT" => Self::Insert,
            "INTO" => Self::Into,
            "VALUES" => Self::Values,
            "UPDATE" => Self::Update,
            "SET" => Self::Set,
            "DELETE" => Self::Delete,
            "DEFAULT" => Self::Default,
            "CREATE" => Self::Create,
            "DROP" => Self::Drop,
            "ALTER" => Self::Alter,
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "IN" => Self::In,
            "BETWEEN" => Self::Between,
            "LIKE" => Self::Like,
            "IS" => Self::Is,
            "NULL" => Self::Null,
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            "EXISTS" => Self::Exists,
            "ASC" => Self::Asc,
            "DESC" => Self::Desc,
            "NULLS" => Self::Nulls,
            "FIRST" => Self::First,
            "LAST" => Self::Last,
            "AS" => Self::As,
            "CASE" => Self::Case,
            "WHEN" => Self::When,
            "THEN" => Self::Then,
            "ELSE" => Self::Else,
            "END" => Self::End,
            "CAST" => Self::Cast,
            _ => return None,
        };
        Some(keyword)
    }

    /// Returns the keyword as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Distinct => "DISTINCT",
            Self::All => "ALL",
            Self::With => "WITH",
            Self::Recursive => "RECURSIVE",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::Cross => "CROSS",
            Self::On => "ON",
            Self::Using => "USING",
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::Default => "DEFAULT",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Exists => "EXISTS",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Nulls => "NULLS",
            Self::First => "FIRST",
            Self::Last => "LAST",
            Self::As => "AS",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Cast => "CAST",
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14)
    Float(f64),
    /// String literal (e.g., 'hello')
    String(String),
    /// Blob literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Identifiers and keywords
    /// Bare identifier (e.g., column_name)
    Identifier(String),
    /// Quoted identifier (e.g., "column name"); never a keyword
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// = or ==
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// ?
    Question,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}
