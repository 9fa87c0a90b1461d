//! Database primitives the migration engine and repositories run on.
//!
//! A [`Database`] executes statements and fetches rows with positional `?`
//! parameters. [`SqliteDatabase`] is the backend used in production and tests.

mod row;
mod sqlite;

pub use row::{FromRow, FromSqlValue, Row};
pub use sqlite::SqliteDatabase;

use crate::error::Error;
use crate::value::SqlValue;

/// Low-level query execution.
pub trait Database {
    /// Execute a statement that returns no rows.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), Error>;

    /// Fetch the first row of a query, if any.
    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, Error>;

    /// Fetch all rows of a query.
    fn fetch_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, Error>;

    /// Fetch the first row and map it into `T`.
    fn fetch_one_as<T: FromRow>(&self, sql: &str, params: &[SqlValue]) -> Result<Option<T>, Error>
    where
        Self: Sized,
    {
        self.fetch_one(sql, params)?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    /// Fetch all rows and map each into `T`.
    fn fetch_many_as<T: FromRow>(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<T>, Error>
    where
        Self: Sized,
    {
        self.fetch_many(sql, params)?
            .iter()
            .map(T::from_row)
            .collect()
    }
}

impl<D: Database + ?Sized> Database for &D {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), Error> {
        (**self).execute(sql, params)
    }

    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, Error> {
        (**self).fetch_one(sql, params)
    }

    fn fetch_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, Error> {
        (**self).fetch_many(sql, params)
    }
}

/// Render a statement with its parameters substituted, for log output.
pub(crate) fn interpolate(sql: &str, params: &[SqlValue]) -> String {
    let mut rendered = String::with_capacity(sql.len());
    let mut params = params.iter();
    let mut in_string = false;

    for c in sql.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                rendered.push(c);
            }
            '?' if !in_string => match params.next() {
                Some(value) => rendered.push_str(&value.to_string()),
                None => rendered.push(c),
            },
            _ => rendered.push(c),
        }
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_params() {
        let sql = "INSERT INTO t (a, b, c) VALUES (?, ?, '?')";
        let params = [SqlValue::from("it's"), SqlValue::Integer(3)];

        assert_eq!(
            interpolate(sql, &params),
            "INSERT INTO t (a, b, c) VALUES ('it''s', 3, '?')"
        );
    }

    #[test]
    fn test_interpolate_missing_params() {
        assert_eq!(interpolate("SELECT ?", &[]), "SELECT ?");
    }
}
