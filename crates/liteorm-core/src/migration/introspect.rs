//! Live schema introspection.
//!
//! Everything here is read fresh from SQLite metadata on each call. A table
//! that does not exist yields empty results rather than an error.

use crate::catalog::PRIMARY_KEY_COLUMN;
use crate::database::{Database, FromRow, Row};
use crate::error::Error;
use crate::value::SqlValue;
use std::collections::BTreeMap;

const TABLE_COLUMNS_SQL: &str = "SELECT name, type AS sql_type, \"notnull\" AS not_null \
     FROM pragma_table_info(?) ORDER BY cid";

const UNIQUE_INDEX_COLUMNS_SQL: &str = "SELECT il.name AS index_name, ii.name AS column_name \
     FROM pragma_index_list(?) AS il JOIN pragma_index_info(il.name) AS ii \
     WHERE il.\"unique\" = 1 ORDER BY il.name, ii.seqno";

/// A physical column of a live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Declared type as stored by SQLite.
    pub sql_type: String,
    /// Whether the column carries NOT NULL.
    pub not_null: bool,
}

impl LiveColumn {
    /// Check if this is the surrogate primary key.
    pub fn is_primary_key(&self) -> bool {
        self.name == PRIMARY_KEY_COLUMN
    }
}

impl FromRow for LiveColumn {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(LiveColumn {
            name: row.get("name")?,
            sql_type: row.get("sql_type")?,
            not_null: row.get("not_null")?,
        })
    }
}

struct UniqueIndexColumn {
    index_name: String,
    column_name: Option<String>,
}

impl FromRow for UniqueIndexColumn {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(UniqueIndexColumn {
            index_name: row.get("index_name")?,
            column_name: row.get("column_name")?,
        })
    }
}

/// Everything the diff engine needs to know about one live table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTable {
    /// Table name.
    pub name: String,
    /// Columns in physical order. Empty when the table does not exist.
    pub columns: Vec<LiveColumn>,
    /// Columns participating in any unique index.
    pub unique_fields: Vec<String>,
    /// Column lists of each unique index.
    pub unique_groups: Vec<Vec<String>>,
    /// Whether the table holds at least one row.
    pub has_rows: bool,
}

impl LiveTable {
    /// Check if the table exists.
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns other than the surrogate key, in physical order.
    pub fn data_columns(&self) -> impl Iterator<Item = &LiveColumn> {
        self.columns.iter().filter(|c| !c.is_primary_key())
    }

    /// Check if some unique index covers exactly `columns`, in any order.
    pub fn has_unique_group(&self, columns: &[String]) -> bool {
        let mut wanted: Vec<&str> = columns.iter().map(String::as_str).collect();
        wanted.sort_unstable();
        self.unique_groups.iter().any(|group| {
            let mut live: Vec<&str> = group.iter().map(String::as_str).collect();
            live.sort_unstable();
            live == wanted
        })
    }
}

/// Reads live table metadata.
pub struct SchemaIntrospector<'a, D: Database> {
    db: &'a D,
}

impl<'a, D: Database> SchemaIntrospector<'a, D> {
    /// Create an introspector over a database.
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Columns of `table` in physical order; empty if the table does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<LiveColumn>, Error> {
        self.db
            .fetch_many_as(TABLE_COLUMNS_SQL, &[SqlValue::from(table)])
    }

    /// Names of columns participating in any unique index of `table`.
    pub fn unique_fields(&self, table: &str) -> Result<Vec<String>, Error> {
        Ok(flatten(&self.unique_groups(table)?))
    }

    /// Column lists of each unique index of `table`.
    ///
    /// Covers both inline `UNIQUE` columns and table-level `UNIQUE(..)`
    /// constraints, which SQLite backs with automatic indexes.
    pub fn unique_groups(&self, table: &str) -> Result<Vec<Vec<String>>, Error> {
        let rows: Vec<UniqueIndexColumn> = self
            .db
            .fetch_many_as(UNIQUE_INDEX_COLUMNS_SQL, &[SqlValue::from(table)])?;

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            // Expression index columns have no name.
            if let Some(column) = row.column_name {
                groups.entry(row.index_name).or_default().push(column);
            }
        }
        Ok(groups.into_values().collect())
    }

    /// Whether `table` holds any rows. `table` must exist.
    pub fn has_rows(&self, table: &str) -> Result<bool, Error> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {}) AS has_rows", table);
        match self.db.fetch_one(&sql, &[])? {
            Some(row) => row.get("has_rows"),
            None => Ok(false),
        }
    }

    /// Read everything known about `table`.
    pub fn snapshot(&self, table: &str) -> Result<LiveTable, Error> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            return Ok(LiveTable {
                name: table.to_string(),
                ..LiveTable::default()
            });
        }

        let unique_groups = self.unique_groups(table)?;

        Ok(LiveTable {
            name: table.to_string(),
            columns,
            unique_fields: flatten(&unique_groups),
            unique_groups,
            has_rows: self.has_rows(table)?,
        })
    }
}

fn flatten(groups: &[Vec<String>]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for column in groups.iter().flatten() {
        if !fields.contains(column) {
            fields.push(column.clone());
        }
    }
    fields
}
