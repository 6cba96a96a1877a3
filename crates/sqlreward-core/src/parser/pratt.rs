//! Pratt expression parser for operator precedence.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Binding power of prefix `NOT`: tighter than AND, looser than comparisons.
pub const NOT_PREFIX_BP: u8 = 5;

/// Binding power of unary minus.
pub const NEG_PREFIX_BP: u8 = 15;

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)` where:
/// - Higher binding power = binds tighter
/// - Left associative: left_bp < right_bp
///
/// `NOT` is reported with comparison strength; the parser only treats it as
/// infix when it is followed by IN, BETWEEN or LIKE.
///
/// Returns `None` if the token is not an infix operator.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),
        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Keyword(
            Keyword::Is | Keyword::In | Keyword::Between | Keyword::Like | Keyword::Not,
        ) => Some((7, 8)),

        TokenKind::Plus | TokenKind::Minus | TokenKind::Concat => Some((11, 12)),

        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((13, 14)),

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        TokenKind::Concat => Some(BinaryOp::Concat),
        _ => None,
    }
}

/// Converts a token to a prefix unary operator and its binding power.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<(UnaryOp, u8)> {
    match kind {
        TokenKind::Minus => Some((UnaryOp::Neg, NEG_PREFIX_BP)),
        TokenKind::Keyword(Keyword::Not) => Some((UnaryOp::Not, NOT_PREFIX_BP)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        let add_bp = infix_binding_power(&TokenKind::Plus).unwrap();
        let mul_bp = infix_binding_power(&TokenKind::Star).unwrap();
        assert!(mul_bp.0 > add_bp.0);

        let and_bp = infix_binding_power(&TokenKind::Keyword(Keyword::And)).unwrap();
        let or_bp = infix_binding_power(&TokenKind::Keyword(Keyword::Or)).unwrap();
        assert!(and_bp.0 > or_bp.0);

        let eq_bp = infix_binding_power(&TokenKind::Eq).unwrap();
        assert!(eq_bp.0 > and_bp.0);
    }

    #[test]
    fn test_not_sits_between_and_and_comparisons() {
        let and_bp = infix_binding_power(&TokenKind::Keyword(Keyword::And)).unwrap();
        let eq_bp = infix_binding_power(&TokenKind::Eq).unwrap();
        assert!(NOT_PREFIX_BP > and_bp.0);
        assert!(NOT_PREFIX_BP < eq_bp.0);
    }

    #[test]
    fn test_token_to_ops() {
        assert_eq!(token_to_binary_op(&TokenKind::Plus), Some(BinaryOp::Add));
        assert_eq!(token_to_binary_op(&TokenKind::LeftParen), None);
        assert_eq!(
            token_to_unary_op(&TokenKind::Keyword(Keyword::Not)),
            Some((UnaryOp::Not, NOT_PREFIX_BP))
        );
        assert_eq!(token_to_unary_op(&TokenKind::Plus), None);
    }
}
