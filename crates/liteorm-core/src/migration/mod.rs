//! Schema migration engine for liteorm.
//!
//! Compares each declared table with the live SQLite table and applies the
//! difference:
//!
//! | Classification | Trigger | Operations |
//! |----------------|---------|------------|
//! | **Create** | table missing | one `CREATE TABLE IF NOT EXISTS` |
//! | **Additive** | only plain columns missing | one `ALTER TABLE .. ADD COLUMN` each |
//! | **Recreate** | removed column, nullability change, new unique column or constraint | create temp, copy, drop (critical), rename |
//!
//! Recreation dominates: a single rebuild trigger discards any additive
//! operations in favour of the four-step rebuild.
//!
//! # Modes
//!
//! [`MigrationMode::DryRun`] (the default) renders plans and never executes a
//! statement. A plan that needs recreation ends with
//! [`MigrationError::RecreationBlocked`]. [`MigrationMode::Execute`] gates every
//! operation behind an [`Operator`] confirmation.
//!
//! # Example
//!
//! ```ignore
//! use liteorm_core::migration::{MigrationConfig, Migrator, TerminalOperator};
//!
//! let db = SqliteDatabase::open("app.db")?;
//! let mut migrator = Migrator::new(db, TerminalOperator::stdio(), MigrationConfig::from_env());
//!
//! for report in migrator.migrate_catalog(&catalog)? {
//!     println!("{}", report);
//! }
//! ```

pub mod column;
pub mod config;
pub mod controller;
pub mod diff;
pub mod display;
pub mod error;
pub mod introspect;
pub mod migrator;
pub mod operator;
pub mod plan;
pub mod report;
pub mod resolve;

// Re-export main types

// Config types
pub use config::{MigrationConfig, MigrationMode, ATOMIC_ENV, CONFIRM_ENV};

// Diff types
pub use column::{describe_column, ColumnDefinition};
pub use diff::{ColumnChange, DiffKind, TableDiff};
pub use introspect::{LiveColumn, LiveTable, SchemaIntrospector};

// Plan types
pub use plan::{CopyResolution, Planner, RecreationDraft, SqlOperation, TablePlan, NO_COPY_QUERY};

// Execution types
pub use controller::ExecutionController;
pub use error::MigrationError;
pub use migrator::Migrator;
pub use operator::{Choice, Operator, TerminalOperator};
pub use report::{MigrationOutcome, MigrationReport};
