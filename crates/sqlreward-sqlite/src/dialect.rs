//! SQLite dialect implementation.

use sqlreward_core::dialect::Dialect;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_bracket_identifiers(&self) -> bool {
        true // MS Access / SQL Server compatibility
    }

    fn supports_double_equals(&self) -> bool {
        true
    }
}
