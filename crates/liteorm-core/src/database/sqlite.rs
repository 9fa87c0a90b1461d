//! SQLite backend.

use super::{interpolate, Database, Row};
use crate::error::Error;
use crate::value::SqlValue;
use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, error};

/// A single SQLite connection shared behind a mutex.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!(target: "liteorm::sqlite", path = %path.display(), "opening database");
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn log_failure(sql: &str, params: &[SqlValue], err: &rusqlite::Error) {
        error!(
            target: "liteorm::sqlite",
            query = %interpolate(sql, params),
            error = %err,
            "statement failed"
        );
    }

    fn query_rows(
        conn: &Connection,
        sql: &str,
        params: &[SqlValue],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(SqlValue::from))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(Row::new(columns.clone(), values));
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
        }
        Ok(out)
    }
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), Error> {
        debug!(target: "liteorm::sqlite", sql, params = params.len(), "execute");
        let conn = self.conn.lock();
        conn.execute(sql, params_from_iter(params.iter()))
            .map(|_| ())
            .map_err(|e| {
                Self::log_failure(sql, params, &e);
                Error::from(e)
            })
    }

    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, Error> {
        debug!(target: "liteorm::sqlite", sql, params = params.len(), "fetch_one");
        let conn = self.conn.lock();
        Self::query_rows(&conn, sql, params, Some(1))
            .map(|rows| rows.into_iter().next())
            .map_err(|e| {
                Self::log_failure(sql, params, &e);
                Error::from(e)
            })
    }

    fn fetch_many(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, Error> {
        debug!(target: "liteorm::sqlite", sql, params = params.len(), "fetch_many");
        let conn = self.conn.lock();
        Self::query_rows(&conn, sql, params, None).map_err(|e| {
            Self::log_failure(sql, params, &e);
            Error::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE note (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL, score REAL)",
            &[],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_execute_and_fetch() {
        let db = setup();
        db.execute(
            "INSERT INTO note (body, score) VALUES (?, ?)",
            &[SqlValue::from("first"), SqlValue::Real(1.5)],
        )
        .unwrap();
        db.execute(
            "INSERT INTO note (body, score) VALUES (?, ?)",
            &[SqlValue::from("second"), SqlValue::Null],
        )
        .unwrap();

        let rows = db
            .fetch_many("SELECT id, body, score FROM note ORDER BY id", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String>("body").unwrap(), "first");
        assert_eq!(rows[1].get::<Option<f64>>("score").unwrap(), None);

        let one = db
            .fetch_one("SELECT body FROM note WHERE id = ?", &[SqlValue::Integer(2)])
            .unwrap()
            .unwrap();
        assert_eq!(one.get::<String>("body").unwrap(), "second");
    }

    #[test]
    fn test_fetch_one_empty() {
        let db = setup();
        assert!(db.fetch_one("SELECT * FROM note", &[]).unwrap().is_none());
    }

    #[test]
    fn test_constraint_failure_is_error() {
        let db = setup();
        let result = db.execute("INSERT INTO note (body) VALUES (?)", &[SqlValue::Null]);
        assert!(matches!(result, Err(Error::Sqlite(_))));
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        {
            let db = SqliteDatabase::open(&path).unwrap();
            db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", &[])
                .unwrap();
            db.execute("INSERT INTO t (v) VALUES ('kept')", &[]).unwrap();
        }

        let db = SqliteDatabase::open(&path).unwrap();
        let row = db.fetch_one("SELECT v FROM t", &[]).unwrap().unwrap();
        assert_eq!(row.get::<String>("v").unwrap(), "kept");
    }
}
