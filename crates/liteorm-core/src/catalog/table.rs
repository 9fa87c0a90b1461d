//! Table schema definitions.

use super::field::FieldDef;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the synthetic surrogate primary key every table carries.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// The declared end-state of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Field definitions in declaration order. The `id` column is implicit.
    pub fields: Vec<FieldDef>,
    /// Table-level UNIQUE constraints, one column list per constraint.
    #[serde(default, rename = "uniques")]
    pub unique_groups: Vec<Vec<String>>,
}

impl TableSchema {
    /// Create a table schema with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            unique_groups: Vec::new(),
        }
    }

    /// Add a field to the table.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add a table-level UNIQUE constraint over `columns`.
    pub fn with_unique(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unique_groups
            .push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check if a field is declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields carrying a single-column UNIQUE constraint.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Names of the tables this table references through foreign keys.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter_map(|f| f.reference.as_ref())
            .map(|r| r.table.as_str())
    }

    /// Check that the schema can be rendered into SQL.
    ///
    /// Names are interpolated into statements unquoted, so they must be plain
    /// identifiers.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(problem) = name_problem(&self.name) {
            return Err(Error::InvalidSchema(format!(
                "table name '{}' {}",
                self.name, problem
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if let Some(problem) = name_problem(&field.name) {
                return Err(Error::InvalidSchema(format!(
                    "{}: field name '{}' {}",
                    self.name, field.name, problem
                )));
            }
            if !field.sql_type.is_well_formed() {
                return Err(Error::InvalidSchema(format!(
                    "{}.{}: '{}' is not a valid type name",
                    self.name, field.name, field.sql_type
                )));
            }
            if field.name.eq_ignore_ascii_case(PRIMARY_KEY_COLUMN) {
                return Err(Error::InvalidSchema(format!(
                    "{}: '{}' is the implicit primary key and cannot be declared",
                    self.name, PRIMARY_KEY_COLUMN
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "{}: field '{}' is declared twice",
                    self.name, field.name
                )));
            }
            if let Some(reference) = &field.reference {
                if name_problem(&reference.table).is_some()
                    || name_problem(&reference.key).is_some()
                {
                    return Err(Error::InvalidSchema(format!(
                        "{}.{}: invalid reference {}({})",
                        self.name, field.name, reference.table, reference.key
                    )));
                }
            }
        }

        for group in &self.unique_groups {
            if group.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "{}: empty unique constraint",
                    self.name
                )));
            }
            for column in group {
                if !self.has_field(column) {
                    return Err(Error::InvalidSchema(format!(
                        "{}: unique constraint names undeclared field '{}'",
                        self.name, column
                    )));
                }
            }
        }

        Ok(())
    }
}

// Keywords SQLite cannot parse as a bare table or column name.
const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "AUTOINCREMENT", "BETWEEN", "CASE", "CHECK",
    "COLLATE", "COMMIT", "CONSTRAINT", "CREATE", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DEFAULT", "DEFERRABLE", "DELETE", "DISTINCT", "DROP", "ELSE",
    "ESCAPE", "EXCEPT", "EXISTS", "FILTER", "FOREIGN", "FROM", "GROUP", "HAVING", "IN",
    "INDEX", "INDEXED", "INSERT", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LIMIT",
    "NOT", "NOTHING", "NOTNULL", "NULL", "ON", "OR", "ORDER", "OVER", "PRIMARY",
    "REFERENCES", "RETURNING", "SELECT", "SET", "TABLE", "THEN", "TO", "TRANSACTION",
    "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WINDOW",
];

fn name_problem(name: &str) -> Option<&'static str> {
    if !is_identifier(name) {
        Some("is not a valid identifier")
    } else if is_reserved_word(name) {
        Some("is a reserved SQL keyword")
    } else {
        None
    }
}

/// Check whether `word` is an SQL keyword that cannot be used unquoted.
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Check that `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
