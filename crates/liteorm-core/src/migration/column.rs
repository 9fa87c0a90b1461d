//! Column and table definition rendering.
//!
//! Rendering is deterministic: the same schema always yields the same SQL, byte
//! for byte.

use crate::catalog::{FieldDef, TableSchema, PRIMARY_KEY_COLUMN};
use std::fmt;

/// A rendered column definition fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    fragment: String,
    unique: bool,
}

impl ColumnDefinition {
    /// The `<name> <type> [NOT NULL] [UNIQUE] [DEFAULT ..]` fragment.
    pub fn as_str(&self) -> &str {
        &self.fragment
    }

    /// Whether the fragment carries a `UNIQUE` constraint.
    ///
    /// SQLite cannot add such a column with `ALTER TABLE`.
    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fragment)
    }
}

/// Render one field as a column definition.
pub fn describe_column(field: &FieldDef) -> ColumnDefinition {
    let mut fragment = format!("{} {}", field.name, field.sql_type);
    if !field.nullable {
        fragment.push_str(" NOT NULL");
    }
    if field.unique {
        fragment.push_str(" UNIQUE");
    }
    if let Some(default) = &field.default {
        fragment.push_str(" DEFAULT ");
        fragment.push_str(&default.to_sql());
    }
    ColumnDefinition {
        fragment,
        unique: field.unique,
    }
}

/// Render the parenthesised body of a `CREATE TABLE` statement.
///
/// The surrogate key comes first, then each field in declaration order, then
/// one `FOREIGN KEY` clause per referencing field, then one `UNIQUE(..)` clause
/// per unique group.
pub fn table_body(schema: &TableSchema) -> String {
    let mut lines = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", PRIMARY_KEY_COLUMN)];

    lines.extend(schema.fields.iter().map(|f| describe_column(f).fragment));

    for field in &schema.fields {
        if let Some(reference) = &field.reference {
            lines.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                field.name, reference.table, reference.key
            ));
        }
    }

    for group in &schema.unique_groups {
        lines.push(format!("UNIQUE({})", group.join(", ")));
    }

    lines.join(", ")
}

/// `CREATE TABLE IF NOT EXISTS` for the declared table.
pub fn create_table_sql(schema: &TableSchema) -> String {
    format!("CREATE TABLE IF NOT EXISTS {} ({})", schema.name, table_body(schema))
}

/// `CREATE TABLE` under another name with the declared schema.
pub fn create_table_as_sql(name: &str, schema: &TableSchema) -> String {
    format!("CREATE TABLE {} ({})", name, table_body(schema))
}
