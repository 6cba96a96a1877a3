//! Declared database schema: table name to ordered column names.
//!
//! All lookups are case-insensitive. A schema is read-only once built.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// A declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<String>,
}

impl TableSchema {
    /// Returns the table name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns whether the table declares `column` (case-insensitive).
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// A mapping of table names to their ordered columns.
///
/// Deserializes from a JSON object such as
/// `{"code_snippets": ["id", "description"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>")]
pub struct Schema {
    tables: BTreeMap<String, TableSchema>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table; a later declaration of the same name replaces the earlier.
    #[must_use]
    pub fn table<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        self.tables.insert(
            name.to_ascii_lowercase(),
            TableSchema {
                name,
                columns: columns.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(&table.to_ascii_lowercase())
    }

    /// Returns whether the schema declares `table`.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.get(table).is_some()
    }

    /// Returns whether `table` exists and declares `column`.
    #[must_use]
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.get(table).is_some_and(|t| t.has_column(column))
    }

    /// Iterates over the declared tables, ordered by lower-cased name.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns whether no tables are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for Schema {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |schema, (name, columns)| schema.table(name, columns))
    }
}

impl From<BTreeMap<String, Vec<String>>> for Schema {
    fn from(tables: BTreeMap<String, Vec<String>>) -> Self {
        tables.into_iter().collect()
    }
}

impl From<HashMap<String, Vec<String>>> for Schema {
    fn from(tables: HashMap<String, Vec<String>>) -> Self {
        tables.into_iter().collect()
    }
}
