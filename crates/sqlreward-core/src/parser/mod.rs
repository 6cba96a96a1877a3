//! SQL Parser
//!
//! A hand-written recursive descent parser with Pratt expression parsing,
//! plus the [`parse`] entry point that turns candidate text into a
//! [`ParsedSql`] or a [`BuildError`].

mod error;
mod parsed;
mod parser;
mod pratt;

pub use error::ParseError;
pub use parsed::{parse, BuildError, ParsedSql, ParserConfig};
pub use parser::{Parser, DEFAULT_MAX_DEPTH};
