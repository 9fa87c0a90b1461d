//! Catalog of declared table schemas.

use super::TableSchema;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A type that declares the table it is stored in.
///
/// Implemented by application entities so they can be registered with a
/// [`Catalog`] without runtime reflection.
pub trait Entity {
    /// The declared end-state of the entity's table.
    fn table_schema() -> TableSchema;
}

/// The set of table schemas an application declares at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Registered tables in registration order.
    tables: Vec<TableSchema>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON declaration file.
    ///
    /// Every table is validated and table names must be unique.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let parsed: Catalog = serde_json::from_str(json)?;
        let mut catalog = Catalog::new();
        for table in parsed.tables {
            catalog.register(table)?;
        }
        Ok(catalog)
    }

    /// Serialize the catalog as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Register a table schema.
    pub fn register(&mut self, table: TableSchema) -> Result<(), Error> {
        table.validate()?;
        if self.get(&table.name).is_some() {
            return Err(Error::DuplicateTable(table.name));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Register the table of an [`Entity`] type.
    pub fn register_entity<E: Entity>(&mut self) -> Result<(), Error> {
        self.register(E::table_schema())
    }

    /// Builder form of [`Catalog::register`].
    pub fn with_table(mut self, table: TableSchema) -> Result<Self, Error> {
        self.register(table)?;
        Ok(self)
    }

    /// Get a table schema by name.
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Iterate tables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables ordered so that referenced tables come before the tables that
    /// reference them.
    ///
    /// References to tables outside the catalog and self-references do not
    /// constrain the order. Ties keep registration order.
    pub fn migration_order(&self) -> Result<Vec<&TableSchema>, Error> {
        let index: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.tables.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tables.len()];

        for (i, table) in self.tables.iter().enumerate() {
            let targets: BTreeSet<usize> = table
                .referenced_tables()
                .filter_map(|name| index.get(name).copied())
                .filter(|&j| j != i)
                .collect();
            for j in targets {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.tables.len());

        while let Some(i) = ready.pop_first() {
            order.push(&self.tables[i]);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.tables.len() {
            let cyclic: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(i, _)| self.tables[i].name.as_str())
                .collect();
            return Err(Error::InvalidSchema(format!(
                "circular foreign key references between: {}",
                cyclic.join(", ")
            )));
        }

        Ok(order)
    }
}
