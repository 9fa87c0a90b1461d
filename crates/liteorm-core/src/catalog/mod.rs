//! Declared-schema catalog for liteorm.
//!
//! The catalog holds the table schemas an application declares at startup. It is
//! read-only to the migration engine.

mod catalog;
mod field;
mod table;
mod types;

pub use catalog::{Catalog, Entity};
pub use field::{DefaultValue, FieldDef, ForeignKeyRef};
pub use table::{is_identifier, TableSchema, PRIMARY_KEY_COLUMN};
pub use types::SqlType;
