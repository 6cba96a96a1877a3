//! SQL Dialect support.
//!
//! Dialects differ mostly in how identifiers may be quoted. The dialect is
//! always passed explicitly to the lexer and parser; there is no process-wide
//! default.

mod generic;

pub use generic::GenericDialect;

/// Trait for SQL dialect-specific lexing behavior.
pub trait Dialect {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns whether `c` opens a quoted identifier that is closed by the
    /// same character (e.g. `"` in standard SQL, `` ` `` in MySQL/SQLite).
    fn is_identifier_quote(&self, c: char) -> bool {
        c == '"' || c == '`'
    }

    /// Returns whether `[name]` is accepted as a quoted identifier.
    fn supports_bracket_identifiers(&self) -> bool {
        false
    }

    /// Returns whether `==` is accepted as an equality operator.
    fn supports_double_equals(&self) -> bool {
        false
    }

    /// Quotes an identifier using the dialect's preferred quote character.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
