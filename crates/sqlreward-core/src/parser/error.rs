//! Parser error types.

use crate::lexer::{Span, TokenKind};

/// A parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error.
    ///
    /// Lexer error tokens are reported with their own message.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected: String = expected.into();
        let message = match &found {
            TokenKind::Error(reason) => reason.clone(),
            TokenKind::Eof => format!("Unexpected end of input: expected {expected}"),
            other => format!("Unexpected token: expected {expected}, found {other:?}"),
        };
        Self {
            message,
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}
