//! Declared-versus-live table diffing.
//!
//! Compares a declared [`TableSchema`] with an introspected [`LiveTable`] and
//! classifies the result. SQLite can only add plain columns in place, so every
//! other difference forces the table to be rebuilt.

use super::column::{describe_column, ColumnDefinition};
use super::introspect::LiveTable;
use crate::catalog::{FieldDef, TableSchema};
use std::fmt;

/// How a table has to change to match its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    /// The table does not exist yet.
    Create,
    /// Live and declared schemas agree.
    NoChange,
    /// Only plain columns are missing; `ALTER TABLE ADD COLUMN` suffices.
    Additive,
    /// The table has to be rebuilt under a temporary name.
    Recreate,
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::Create => write!(f, "create"),
            DiffKind::NoChange => write!(f, "no change"),
            DiffKind::Additive => write!(f, "additive"),
            DiffKind::Recreate => write!(f, "recreate"),
        }
    }
}

/// A single difference between a live table and its declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    /// A declared field has no live column.
    Added {
        /// The declared field.
        field: FieldDef,
        /// Its rendered definition.
        definition: ColumnDefinition,
    },
    /// A live column is no longer declared.
    Removed {
        /// Column name.
        column: String,
    },
    /// A column's NOT NULL flag disagrees with the declaration.
    NullabilityChanged {
        /// Column name.
        column: String,
        /// Whether the live column is NOT NULL.
        live_not_null: bool,
        /// Whether the declared field is nullable.
        declared_nullable: bool,
    },
    /// A field declared `unique` is not covered by any live unique index.
    UniqueConstraintMissing {
        /// Column name.
        column: String,
    },
    /// A declared unique group has no matching live unique index.
    UniqueGroupMissing {
        /// Columns of the group.
        columns: Vec<String>,
    },
}

impl ColumnChange {
    /// Whether this change can only be applied by rebuilding the table.
    pub fn requires_recreation(&self) -> bool {
        match self {
            ColumnChange::Added { definition, .. } => definition.is_unique(),
            _ => true,
        }
    }

    /// Human-readable summary.
    pub fn describe(&self) -> String {
        match self {
            ColumnChange::Added { field, definition } if definition.is_unique() => {
                format!("new unique column '{}'", field.name)
            }
            ColumnChange::Added { field, .. } => format!("new column '{}'", field.name),
            ColumnChange::Removed { column } => {
                format!("column '{}' is no longer declared", column)
            }
            ColumnChange::NullabilityChanged {
                column,
                declared_nullable,
                ..
            } => {
                if *declared_nullable {
                    format!("column '{}' becomes nullable", column)
                } else {
                    format!("column '{}' becomes NOT NULL", column)
                }
            }
            ColumnChange::UniqueConstraintMissing { column } => {
                format!("column '{}' needs a UNIQUE constraint", column)
            }
            ColumnChange::UniqueGroupMissing { columns } => {
                format!("missing UNIQUE({})", columns.join(", "))
            }
        }
    }
}

/// Diff between one declared table and its live counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    /// Table name.
    pub table: String,
    /// Whether the live table exists.
    pub table_exists: bool,
    /// Detected changes. Empty when the table does not exist.
    pub changes: Vec<ColumnChange>,
}

impl TableDiff {
    /// Compare a declaration with the live table.
    pub fn compute(schema: &TableSchema, live: &LiveTable) -> Self {
        if !live.exists() {
            return TableDiff {
                table: schema.name.clone(),
                table_exists: false,
                changes: Vec::new(),
            };
        }

        let mut changes = Vec::new();

        // Missing columns
        for field in &schema.fields {
            if !live.has_column(&field.name) {
                changes.push(ColumnChange::Added {
                    field: field.clone(),
                    definition: describe_column(field),
                });
            }
        }

        // Extra columns
        for column in live.data_columns() {
            if !schema.has_field(&column.name) {
                changes.push(ColumnChange::Removed {
                    column: column.name.clone(),
                });
            }
        }

        // Nullability of columns present on both sides
        for column in live.data_columns() {
            if let Some(field) = schema.get_field(&column.name) {
                if column.not_null == field.nullable {
                    changes.push(ColumnChange::NullabilityChanged {
                        column: column.name.clone(),
                        live_not_null: column.not_null,
                        declared_nullable: field.nullable,
                    });
                }
            }
        }

        // Single-column uniques; new unique columns are already covered by Added
        for field in schema.unique_fields() {
            if live.has_column(&field.name) && !live.unique_fields.contains(&field.name) {
                changes.push(ColumnChange::UniqueConstraintMissing {
                    column: field.name.clone(),
                });
            }
        }

        // Unique groups; groups over new columns cannot exist yet either
        for group in &schema.unique_groups {
            if !live.has_unique_group(group) {
                changes.push(ColumnChange::UniqueGroupMissing {
                    columns: group.clone(),
                });
            }
        }

        TableDiff {
            table: schema.name.clone(),
            table_exists: true,
            changes,
        }
    }

    /// Classify the diff. Recreation dominates additive changes.
    pub fn kind(&self) -> DiffKind {
        if !self.table_exists {
            DiffKind::Create
        } else if self.changes.iter().any(ColumnChange::requires_recreation) {
            DiffKind::Recreate
        } else if self.changes.is_empty() {
            DiffKind::NoChange
        } else {
            DiffKind::Additive
        }
    }

    /// Fields to add in place with their definitions, in declaration order.
    ///
    /// Only meaningful for [`DiffKind::Additive`].
    pub fn added_columns(&self) -> impl Iterator<Item = (&FieldDef, &ColumnDefinition)> {
        self.changes.iter().filter_map(|change| match change {
            ColumnChange::Added { field, definition } if !definition.is_unique() => {
                Some((field, definition))
            }
            _ => None,
        })
    }

    /// Changes that force a rebuild.
    pub fn recreation_reasons(&self) -> impl Iterator<Item = &ColumnChange> {
        self.changes.iter().filter(|c| c.requires_recreation())
    }
}
