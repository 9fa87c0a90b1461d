//! Migration-specific error types.

use crate::error::Error;
use thiserror::Error;

/// Migration-specific errors.
///
/// Operator cancellations are not errors; they surface as
/// [`MigrationOutcome::Declined`](super::MigrationOutcome::Declined).
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Introspection or schema validation failed.
    #[error(transparent)]
    Database(#[from] Error),

    /// A planned statement failed and the remaining operations were not run.
    #[error("{table}: '{description}' failed: {source}")]
    StatementFailed {
        /// Table being migrated.
        table: String,
        /// Description of the failed operation.
        description: String,
        /// The statement that failed.
        query: String,
        /// Underlying database error.
        #[source]
        source: Error,
    },

    /// Dry-run mode reached a plan that rebuilds the table.
    #[error("table '{table}' requires recreation; enable confirmed migrations to apply it")]
    RecreationBlocked {
        /// Table requiring recreation.
        table: String,
    },

    /// A new NOT NULL column needs a backfill value and none was supplied.
    #[error("no default value supplied for new NOT NULL column {table}.{column}")]
    MissingDefault {
        /// Table being migrated.
        table: String,
        /// Column lacking a value.
        column: String,
    },

    /// A table rebuild left rows whose foreign keys no longer resolve.
    #[error("{table}: rebuild left {violations} unresolved foreign keys, first in '{child}'")]
    ForeignKeyViolation {
        /// Table being recreated.
        table: String,
        /// Table holding the first broken reference.
        child: String,
        /// Violations added by the rebuild.
        violations: usize,
    },

    /// No unused temporary table name could be generated.
    #[error("could not find a free temporary table name for '{table}' after {attempts} attempts")]
    TempNameExhausted {
        /// Table being recreated.
        table: String,
        /// Names tried.
        attempts: usize,
    },

    /// Operator terminal I/O failed.
    #[error("operator I/O error: {0}")]
    Operator(#[from] std::io::Error),
}

impl MigrationError {
    /// Process exit status for this error.
    ///
    /// `2` marks a dry-run stop on a required recreation, `3` a missing default.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::RecreationBlocked { .. } => 2,
            MigrationError::MissingDefault { .. } => 3,
            _ => 1,
        }
    }
}
