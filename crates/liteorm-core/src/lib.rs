//! liteorm Core - Schema catalog, SQLite access, and table migration.
//!
//! This crate provides the declared-schema model, the database primitives the
//! migration engine runs on, and the migration engine itself.

pub mod catalog;
pub mod database;
pub mod error;
pub mod migration;
pub mod value;

pub use catalog::{Catalog, DefaultValue, Entity, FieldDef, ForeignKeyRef, SqlType, TableSchema};
pub use database::{Database, FromRow, FromSqlValue, Row, SqliteDatabase};
pub use error::Error;
pub use migration::{
    DiffKind, MigrationConfig, MigrationError, MigrationMode, MigrationOutcome, MigrationReport,
    Migrator, Operator, SqlOperation, TableDiff, TerminalOperator,
};
pub use value::SqlValue;
