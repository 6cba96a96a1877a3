//! Alias resolution over a whole statement.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::ast::visit::{walk_query, walk_statement, walk_table_ref};
use crate::ast::{Query, Statement, TableRef, Visitor};

/// What an alias is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AliasTarget {
    Table(String),
    Derived,
    Ambiguous,
}

/// Result of resolving a column qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The qualifier is an alias of exactly one base table.
    Table(&'a str),
    /// The qualifier names a derived table or CTE; its columns are not declared.
    Derived,
    /// The alias is bound to more than one target.
    Ambiguous,
    /// The qualifier is not an alias.
    Unmapped,
}

/// Maps aliases to base tables for one statement.
///
/// Keys and table names are lower-cased. An alias equal to its base table
/// name is not recorded. An alias bound to two different targets resolves to
/// [`Resolution::Ambiguous`] rather than to either of them.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    aliases: HashMap<String, AliasTarget>,
    ctes: HashSet<String>,
    tables: Vec<String>,
    references: HashMap<String, BTreeSet<String>>,
}

impl AliasMap {
    /// Builds the alias map for every scope of `statement`.
    #[must_use]
    pub fn build(statement: &Statement) -> Self {
        let mut map = Self::default();
        map.visit_statement(statement);
        map
    }

    /// Resolves a column qualifier.
    #[must_use]
    pub fn resolve(&self, qualifier: &str) -> Resolution<'_> {
        match self.aliases.get(&qualifier.to_ascii_lowercase()) {
            Some(AliasTarget::Table(table)) => Resolution::Table(table.as_str()),
            Some(AliasTarget::Derived) => Resolution::Derived,
            Some(AliasTarget::Ambiguous) => Resolution::Ambiguous,
            None => Resolution::Unmapped,
        }
    }

    /// Returns whether `name` is declared as a CTE anywhere in the statement.
    #[must_use]
    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.contains(&name.to_ascii_lowercase())
    }

    /// Returns the referenced base tables in order of first appearance.
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Returns the qualifier to use when comparing column references.
    ///
    /// An alias is replaced by its base table only when that table is
    /// referenced under a single name; in a self-join each alias stays
    /// distinct.
    #[must_use]
    pub fn canonical_qualifier(&self, qualifier: &str) -> String {
        let qualifier = qualifier.to_ascii_lowercase();
        match self.aliases.get(&qualifier) {
            Some(AliasTarget::Table(table))
                if self.references.get(table).is_some_and(|names| names.len() == 1) =>
            {
                table.clone()
            }
            _ => qualifier,
        }
    }

    /// Records a base table referenced as `name [AS alias]`.
    pub(crate) fn record_table(&mut self, name: &str, alias: Option<&str>) {
        let table = name.to_ascii_lowercase();
        if self.is_cte(&table) {
            if let Some(alias) = alias {
                self.bind(alias, AliasTarget::Derived);
            }
            return;
        }

        if !self.tables.contains(&table) {
            self.tables.push(table.clone());
        }
        let reference = alias.map_or_else(|| table.clone(), str::to_ascii_lowercase);
        self.references
            .entry(table.clone())
            .or_default()
            .insert(reference.clone());
        if reference != table {
            self.bind(&reference, AliasTarget::Table(table));
        }
    }

    fn bind(&mut self, alias: &str, target: AliasTarget) {
        let alias = alias.to_ascii_lowercase();
        match self.aliases.get(&alias) {
            None => {
                self.aliases.insert(alias, target);
            }
            Some(existing) if *existing == target => {}
            Some(_) => {
                self.aliases.insert(alias, AliasTarget::Ambiguous);
            }
        }
    }
}

impl Visitor for AliasMap {
    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Insert(insert) => self.record_table(&insert.table, None),
            Statement::Update(update) => {
                self.record_table(&update.table, update.alias.as_deref());
            }
            Statement::Delete(delete) => {
                self.record_table(&delete.table, delete.alias.as_deref());
            }
            Statement::Query(_) => {}
        }
        walk_statement(self, statement);
    }

    fn visit_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                self.ctes.insert(cte.name.to_ascii_lowercase());
            }
        }
        walk_query(self, query);
    }

    fn visit_table_ref(&mut self, table_ref: &TableRef) {
        match table_ref {
            TableRef::Table { name, alias, .. } => self.record_table(name, alias.as_deref()),
            TableRef::Subquery {
                alias: Some(alias), ..
            } => self.bind(alias, AliasTarget::Derived),
            TableRef::Subquery { .. } | TableRef::Join { .. } => {}
        }
        walk_table_ref(self, table_ref);
    }
}
