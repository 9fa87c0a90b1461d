//! Core error types.

use thiserror::Error;

/// Core database and schema errors.
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row did not carry the requested column.
    #[error("missing column '{0}' in row")]
    MissingColumn(String),

    /// A row value could not be converted to the requested type.
    #[error("column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Requested type.
        expected: &'static str,
        /// Stored value kind.
        found: &'static str,
    },

    /// A declared schema is not usable.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A table was registered twice in a catalog.
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    /// Schema declaration (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
