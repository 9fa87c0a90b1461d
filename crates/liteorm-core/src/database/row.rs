//! Result rows and typed row mapping.

use crate::error::Error;
use crate::value::SqlValue;

/// One result row, with its column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from parallel column and value lists.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Get a column converted to `T`.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, Error> {
        let value = self
            .value(column)
            .ok_or_else(|| Error::MissingColumn(column.to_string()))?;
        T::from_sql_value(value).ok_or_else(|| Error::TypeMismatch {
            column: column.to_string(),
            expected: T::EXPECTED,
            found: value.kind(),
        })
    }
}

/// Conversion from a stored value.
pub trait FromSqlValue: Sized {
    /// Type name used in mismatch errors.
    const EXPECTED: &'static str;

    /// Convert, returning `None` on a storage class mismatch.
    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSqlValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromSqlValue for f64 {
    const EXPECTED: &'static str = "real";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Real(v) => Some(*v),
            SqlValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromSqlValue for String {
    const EXPECTED: &'static str = "text";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromSqlValue for Vec<u8> {
    const EXPECTED: &'static str = "blob";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Blob(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromSqlValue for SqlValue {
    const EXPECTED: &'static str = "any";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// Explicit mapping from a row to a typed record.
pub trait FromRow: Sized {
    /// Build the record, failing on a missing or mistyped column.
    fn from_row(row: &Row) -> Result<Self, Error>;
}
