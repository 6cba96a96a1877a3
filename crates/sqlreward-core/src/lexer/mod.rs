//! SQL Lexer/Tokenizer
//!
//! A hand-written, dialect-aware lexer that produces a stream of tokens.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
