//! Building a validated query from raw SQL text.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use super::error::ParseError;
use super::parser::{Parser, DEFAULT_MAX_DEPTH};
use crate::ast::{Statement, StatementKind};
use crate::dialect::Dialect;
use crate::lexer::{Keyword, Lexer, TokenKind};

/// Errors produced while building a query from SQL text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The text is not a single well-formed statement.
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// The statement parsed but its kind is not allowed.
    #[error("Unsupported statement: {kind}")]
    UnsupportedStatement {
        /// The rejected statement kind.
        kind: StatementKind,
    },
}

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Statement kinds accepted by [`parse`].
    pub allowed: HashSet<StatementKind>,
    /// How deeply expressions and queries may nest.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allowed: HashSet::from([StatementKind::Select, StatementKind::With]),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    /// Adds a statement kind to the allowlist.
    #[must_use]
    pub fn allow(mut self, kind: StatementKind) -> Self {
        self.allowed.insert(kind);
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A successfully parsed statement together with the text it came from.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSql {
    text: String,
    statement: Statement,
}

impl ParsedSql {
    /// Returns the original SQL text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the parsed statement.
    #[must_use]
    pub const fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Returns the statement kind.
    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.statement.kind()
    }
}

/// Parses `sql` into exactly one statement and checks it against the
/// allowlist in `config`.
///
/// `CREATE`, `DROP` and `ALTER` are recognized only to be rejected as
/// [`StatementKind::Ddl`].
///
/// # Errors
///
/// Returns [`BuildError::Syntax`] for malformed or multi-statement input or
/// nesting deeper than `config.max_depth`, and
/// [`BuildError::UnsupportedStatement`] for disallowed statement kinds.
pub fn parse(
    sql: &str,
    dialect: &dyn Dialect,
    config: &ParserConfig,
) -> Result<ParsedSql, BuildError> {
    let first = Lexer::new(sql, dialect).next_token();
    if matches!(
        first.kind,
        TokenKind::Keyword(Keyword::Create | Keyword::Drop | Keyword::Alter)
    ) {
        debug!(dialect = dialect.name(), "Rejected DDL statement");
        return Err(BuildError::UnsupportedStatement {
            kind: StatementKind::Ddl,
        });
    }

    let statement = Parser::new(sql, dialect)
        .max_depth(config.max_depth)
        .parse_statement()
        .map_err(|err| {
            debug!(dialect = dialect.name(), error = %err, "Failed to parse SQL");
            err
        })?;

    let kind = statement.kind();
    if !config.allowed.contains(&kind) {
        debug!(%kind, "Statement kind not allowed");
        return Err(BuildError::UnsupportedStatement { kind });
    }

    Ok(ParsedSql {
        text: sql.to_string(),
        statement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;

    fn build(sql: &str) -> Result<ParsedSql, BuildError> {
        parse(sql, &GenericDialect::new(), &ParserConfig::default())
    }

    #[test]
    fn test_select_is_allowed_by_default() {
        let parsed = build("SELECT 1").unwrap();
        assert_eq!(parsed.kind(), StatementKind::Select);
        assert_eq!(parsed.text(), "SELECT 1");
    }

    #[test]
    fn test_with_is_allowed_by_default() {
        let parsed = build("WITH x AS (SELECT 1) SELECT * FROM x").unwrap();
        assert_eq!(parsed.kind(), StatementKind::With);
    }

    #[test]
    fn test_dml_is_rejected_by_default() {
        assert_eq!(
            build("DELETE FROM t"),
            Err(BuildError::UnsupportedStatement {
                kind: StatementKind::Delete
            })
        );
    }

    #[test]
    fn test_dml_can_be_allowed() {
        let config = ParserConfig::default().allow(StatementKind::Update);
        assert!(parse("UPDATE t SET a = 1", &GenericDialect::new(), &config).is_ok());
    }

    #[test]
    fn test_ddl_is_always_rejected() {
        assert_eq!(
            build("DROP TABLE t"),
            Err(BuildError::UnsupportedStatement {
                kind: StatementKind::Ddl
            })
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(build(""), Err(BuildError::Syntax(_))));
        assert!(matches!(build("SELEC 1"), Err(BuildError::Syntax(_))));
        assert!(matches!(
            build("SELECT 1; SELECT 2"),
            Err(BuildError::Syntax(_))
        ));
    }

    #[test]
    fn test_config_deserializes_allowlist() {
        let config: ParserConfig = serde_json::from_str(r#"{"allowed": ["SELECT"]}"#).unwrap();
        assert!(config.allowed.contains(&StatementKind::Select));
        assert!(!config.allowed.contains(&StatementKind::With));
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        let default: ParserConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default, ParserConfig::default());
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = 20_000;
        let sql = format!("SELECT {}1{}", "(".repeat(depth), ")".repeat(depth));
        match build(&sql) {
            Err(BuildError::Syntax(err)) => {
                assert!(err.message.contains("maximum depth"), "{err}");
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }

        let subqueries = format!(
            "SELECT * FROM t WHERE a IN {}(SELECT 1){}",
            "(SELECT * FROM t WHERE a IN ".repeat(depth),
            ")".repeat(depth)
        );
        assert!(matches!(build(&subqueries), Err(BuildError::Syntax(_))));

        let joins = format!("SELECT * FROM {}t{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(build(&joins), Err(BuildError::Syntax(_))));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let sql = format!("SELECT {}1{} FROM t", "(".repeat(20), ")".repeat(20));
        assert!(build(&sql).is_ok());

        let config = ParserConfig::default().max_depth(4);
        let err = parse(&sql, &GenericDialect::new(), &config).unwrap_err();
        assert!(matches!(err, BuildError::Syntax(_)));
    }
}
