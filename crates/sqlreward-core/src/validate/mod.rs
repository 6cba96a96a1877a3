//! Schema validation.
//!
//! Checks every table and column a statement references against a declared
//! [`Schema`], resolving aliases through an [`AliasMap`].

mod alias;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use alias::{AliasMap, Resolution};

use crate::ast::visit::{
    walk_expr, walk_query, walk_select, walk_set_expr, walk_statement, walk_table_ref,
};
use crate::ast::{Expr, Query, SelectStatement, SetExpr, Statement, TableRef, Visitor};
use crate::metadata::{Complexity, QueryMetadata};
use crate::parser::ParsedSql;
use crate::schema::Schema;

/// Reasons a statement does not fit the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A referenced table is not declared.
    #[error("table '{0}' not in schema")]
    TableNotFound(String),

    /// A referenced column is not declared on its table.
    #[error("column '{table}.{column}' not found")]
    ColumnNotFound {
        /// Table or qualifier the column was looked up on.
        table: String,
        /// The column name.
        column: String,
    },

    /// A qualifier is bound to more than one table.
    #[error("alias '{0}' is ambiguous")]
    AmbiguousAlias(String),

    /// A qualifier is neither an alias nor a known table.
    #[error("unresolved qualifier '{0}'")]
    UnresolvedQualifier(String),

    /// Lenient mode found no referenced table in the schema.
    #[error("no referenced table is in schema")]
    NoKnownTables,

    /// A complex question was answered without any complex SQL feature.
    #[error("complex query uses no JOIN, GROUP BY, HAVING, set operation, CTE, CASE or subquery")]
    MissingComplexFeatures,
}

/// How strictly references are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Every table and column must resolve.
    #[default]
    Strict,
    /// At least one referenced table must exist; column failures are ignored.
    Lenient,
}

impl ValidationMode {
    /// Picks the mode for a declared complexity: lenient for complex queries.
    #[must_use]
    pub fn for_complexity(complexity: Option<Complexity>) -> Self {
        if complexity == Some(Complexity::Complex) {
            Self::Lenient
        } else {
            Self::Strict
        }
    }
}

/// Outcome of schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether the statement passed.
    pub valid: bool,
    /// Why it failed; `None` when valid.
    pub reason: Option<String>,
}

impl ValidationResult {
    /// A passing result.
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    /// A failing result with a reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

impl From<Result<(), SchemaError>> for ValidationResult {
    fn from(result: Result<(), SchemaError>) -> Self {
        match result {
            Ok(()) => Self::passed(),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Require complex questions to be answered with at least one complex SQL
    /// feature.
    pub require_complex_features: bool,
}

impl ValidatorConfig {
    /// Sets whether complex questions need complex SQL features.
    #[must_use]
    pub const fn require_complex_features(mut self, required: bool) -> Self {
        self.require_complex_features = required;
        self
    }
}

/// Validates parsed statements with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    config: ValidatorConfig,
}

impl SchemaValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validates `parsed`; the mode follows the declared complexity.
    ///
    /// An absent schema skips reference checks.
    #[must_use]
    pub fn check(
        &self,
        parsed: &ParsedSql,
        schema: Option<&Schema>,
        metadata: &QueryMetadata,
    ) -> ValidationResult {
        let statement = parsed.statement();
        if let Some(schema) = schema {
            let mode = ValidationMode::for_complexity(metadata.complexity);
            let result = validate(statement, schema, mode);
            if !result.valid {
                return result;
            }
        }

        if self.config.require_complex_features
            && metadata.is_complex()
            && !uses_complex_features(statement)
        {
            debug!("Complex question answered without complex features");
            return ValidationResult::failed(SchemaError::MissingComplexFeatures.to_string());
        }

        ValidationResult::passed()
    }
}

/// Validates a statement's table and column references against `schema`.
#[must_use]
pub fn validate(statement: &Statement, schema: &Schema, mode: ValidationMode) -> ValidationResult {
    let result = check_references(statement, schema, mode);
    if let Err(err) = &result {
        debug!(?mode, reason = %err, "Schema validation failed");
    }
    result.into()
}

fn check_references(
    statement: &Statement,
    schema: &Schema,
    mode: ValidationMode,
) -> Result<(), SchemaError> {
    let aliases = AliasMap::build(statement);
    let tables = aliases.tables();

    if tables.is_empty() {
        return Ok(());
    }

    if mode == ValidationMode::Lenient {
        return if tables.iter().any(|t| schema.has_table(t)) {
            Ok(())
        } else {
            Err(SchemaError::NoKnownTables)
        };
    }

    if let Some(missing) = tables.iter().find(|t| !schema.has_table(t)) {
        return Err(SchemaError::TableNotFound(missing.clone()));
    }

    let mut collector = ColumnCollector::default();
    collector.visit_statement(statement);

    for column in &collector.columns {
        check_column(column, &aliases, schema)?;
    }
    Ok(())
}

fn check_column(
    column: &ColumnRef,
    aliases: &AliasMap,
    schema: &Schema,
) -> Result<(), SchemaError> {
    match column {
        ColumnRef::Qualified { qualifier, name } => {
            let table = match aliases.resolve(qualifier) {
                Resolution::Table(table) => table,
                Resolution::Derived => return Ok(()),
                Resolution::Ambiguous => {
                    return Err(SchemaError::AmbiguousAlias(qualifier.clone()));
                }
                Resolution::Unmapped if aliases.is_cte(qualifier) => return Ok(()),
                Resolution::Unmapped if schema.has_table(qualifier) => qualifier.as_str(),
                Resolution::Unmapped => {
                    return Err(SchemaError::UnresolvedQualifier(qualifier.clone()));
                }
            };
            match name {
                Some(name)
                    if !schema.has_column(table, name)
                        && !ROWID_ALIASES.contains(&name.as_str()) =>
                {
                    Err(SchemaError::ColumnNotFound {
                        table: qualifier.clone(),
                        column: name.clone(),
                    })
                }
                _ => Ok(()),
            }
        }
        ColumnRef::Unqualified {
            name,
            table,
            outer_tables,
            select_alias,
        } => {
            if *select_alias
                || schema.has_column(table, name)
                || outer_tables.iter().any(|t| schema.has_column(t, name))
            {
                Ok(())
            } else {
                Err(SchemaError::ColumnNotFound {
                    table: table.clone(),
                    column: name.clone(),
                })
            }
        }
    }
}

/// Bare names the engine resolves without any declared column.
const NILADIC_FUNCTIONS: &[&str] = &["current_date", "current_time", "current_timestamp"];

/// Implicit row id columns of ordinary tables.
const ROWID_ALIASES: &[&str] = &["rowid", "oid", "_rowid_"];

fn is_builtin_name(name: &str) -> bool {
    NILADIC_FUNCTIONS.contains(&name) || ROWID_ALIASES.contains(&name)
}

/// A column reference that can be checked against the schema.
#[derive(Debug)]
enum ColumnRef {
    /// `q.c`, or `q.*` with no name.
    Qualified {
        qualifier: String,
        name: Option<String>,
    },
    /// A bare name in a scope with exactly one base table.
    Unqualified {
        name: String,
        table: String,
        outer_tables: Vec<String>,
        select_alias: bool,
    },
}

/// Tables visible in one SELECT block (or DML statement).
#[derive(Debug, Default)]
struct Scope {
    tables: Vec<String>,
    derived: bool,
    aliases: HashSet<String>,
}

impl Scope {
    fn for_select(select: &SelectStatement, ctes: &HashSet<String>) -> Self {
        let mut scope = Self {
            aliases: select
                .columns
                .iter()
                .filter_map(|c| c.alias.as_ref())
                .map(|a| a.to_ascii_lowercase())
                .collect(),
            ..Self::default()
        };
        for table_ref in &select.from {
            scope.add_table_ref(table_ref, ctes);
        }
        scope
    }

    fn add_table_ref(&mut self, table_ref: &TableRef, ctes: &HashSet<String>) {
        match table_ref {
            TableRef::Table { name, .. } => {
                let name = name.to_ascii_lowercase();
                if ctes.contains(&name) {
                    self.derived = true;
                } else {
                    self.tables.push(name);
                }
            }
            TableRef::Subquery { .. } => self.derived = true,
            TableRef::Join { left, join } => {
                self.add_table_ref(left, ctes);
                self.add_table_ref(&join.table, ctes);
            }
        }
    }

    /// The single table unqualified names must belong to, if unambiguous.
    fn single_table(&self) -> Option<&String> {
        match self.tables.as_slice() {
            [table] if !self.derived => Some(table),
            _ => None,
        }
    }
}

/// Collects checkable column references scope by scope.
#[derive(Debug, Default)]
struct ColumnCollector {
    scopes: Vec<Scope>,
    ctes: HashSet<String>,
    columns: Vec<ColumnRef>,
}

impl ColumnCollector {
    fn with_scope(&mut self, scope: Scope, f: impl FnOnce(&mut Self)) {
        self.scopes.push(scope);
        f(self);
        self.scopes.pop();
    }

    fn record_unqualified(&mut self, name: &str) {
        let Some((current, outer)) = self.scopes.split_last() else {
            return;
        };
        let Some(table) = current.single_table() else {
            return;
        };
        let name = name.to_ascii_lowercase();
        if is_builtin_name(&name) {
            return;
        }
        // Columns of an enclosing derived table or CTE are unknown.
        if outer.iter().any(|scope| scope.derived) {
            return;
        }
        self.columns.push(ColumnRef::Unqualified {
            select_alias: current.aliases.contains(&name)
                || outer.iter().any(|scope| scope.aliases.contains(&name)),
            table: table.clone(),
            outer_tables: outer.iter().flat_map(|s| s.tables.iter().cloned()).collect(),
            name,
        });
    }
}

impl Visitor for ColumnCollector {
    fn visit_statement(&mut self, statement: &Statement) {
        let mut scope = Scope::default();
        match statement {
            Statement::Query(_) => return walk_statement(self, statement),
            Statement::Insert(insert) => {
                for column in &insert.columns {
                    self.columns.push(ColumnRef::Qualified {
                        qualifier: insert.table.to_ascii_lowercase(),
                        name: Some(column.to_ascii_lowercase()),
                    });
                }
            }
            Statement::Update(update) => {
                scope.tables.push(update.table.to_ascii_lowercase());
                for table_ref in &update.from {
                    scope.add_table_ref(table_ref, &self.ctes);
                }
                for assignment in &update.assignments {
                    self.columns.push(ColumnRef::Qualified {
                        qualifier: update.table.to_ascii_lowercase(),
                        name: Some(assignment.column.to_ascii_lowercase()),
                    });
                }
            }
            Statement::Delete(delete) => scope.tables.push(delete.table.to_ascii_lowercase()),
        }
        self.with_scope(scope, |this| walk_statement(this, statement));
    }

    fn visit_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                self.ctes.insert(cte.name.to_ascii_lowercase());
            }
        }
        if query.order_by.is_empty() && query.limit.is_none() && query.offset.is_none() {
            return walk_query(self, query);
        }

        // ORDER BY may name the body's tables and output aliases; after a
        // set operation it may only name output columns.
        let trailing = match &query.body {
            SetExpr::Select(select) => Scope::for_select(select, &self.ctes),
            _ => Scope {
                derived: true,
                ..Scope::default()
            },
        };
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                self.visit_query(&cte.query);
            }
        }
        self.visit_set_expr(&query.body);
        self.with_scope(trailing, |this| {
            for item in &query.order_by {
                this.visit_expr(&item.expr);
            }
            for expr in query.limit.iter().chain(query.offset.iter()) {
                this.visit_expr(expr);
            }
        });
    }

    fn visit_select(&mut self, select: &SelectStatement) {
        let scope = Scope::for_select(select, &self.ctes);
        self.with_scope(scope, |this| walk_select(this, select));
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column {
                table: Some(qualifier),
                name,
                ..
            } => self.columns.push(ColumnRef::Qualified {
                qualifier: qualifier.to_ascii_lowercase(),
                name: Some(name.to_ascii_lowercase()),
            }),
            Expr::Column {
                table: None, name, ..
            } => self.record_unqualified(name),
            Expr::Wildcard {
                table: Some(qualifier),
            } => self.columns.push(ColumnRef::Qualified {
                qualifier: qualifier.to_ascii_lowercase(),
                name: None,
            }),
            _ => walk_expr(self, expr),
        }
    }
}

/// Returns whether a statement uses any feature that marks a complex query:
/// a join (explicit or comma), GROUP BY, HAVING, a set operation, a CTE, a
/// CASE expression or a subquery.
#[must_use]
pub fn uses_complex_features(statement: &Statement) -> bool {
    let mut detector = ComplexFeatureDetector::default();
    detector.visit_statement(statement);
    detector.found
}

#[derive(Default)]
struct ComplexFeatureDetector {
    found: bool,
    depth: usize,
}

impl Visitor for ComplexFeatureDetector {
    fn visit_query(&mut self, query: &Query) {
        self.depth += 1;
        if query.with.is_some() || self.depth > 1 {
            self.found = true;
        }
        walk_query(self, query);
        self.depth -= 1;
    }

    fn visit_set_expr(&mut self, set_expr: &SetExpr) {
        match set_expr {
            // A parenthesized operand is not a nested query.
            SetExpr::Query(query) => walk_query(self, query),
            SetExpr::SetOperation { .. } => {
                self.found = true;
                walk_set_expr(self, set_expr);
            }
            SetExpr::Select(_) => walk_set_expr(self, set_expr),
        }
    }

    fn visit_select(&mut self, select: &SelectStatement) {
        if select.from.len() > 1 || !select.group_by.is_empty() || select.having.is_some() {
            self.found = true;
        }
        walk_select(self, select);
    }

    fn visit_table_ref(&mut self, table_ref: &TableRef) {
        if matches!(table_ref, TableRef::Join { .. }) {
            self.found = true;
        }
        walk_table_ref(self, table_ref);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if matches!(expr, Expr::Case { .. }) {
            self.found = true;
        }
        walk_expr(self, expr);
    }
}
