//! Column type names.

use super::table::{is_identifier, is_reserved_word};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared SQL type of a column.
///
/// SQLite accepts any type name and derives a column affinity from it, so
/// unknown names are kept verbatim in [`SqlType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SqlType {
    /// INTEGER affinity.
    Integer,
    /// REAL affinity.
    Real,
    /// TEXT affinity.
    Text,
    /// BLOB affinity.
    Blob,
    /// NUMERIC affinity.
    Numeric,
    /// BOOLEAN (NUMERIC affinity).
    Boolean,
    /// DATETIME (NUMERIC affinity).
    DateTime,
    /// Any other type name, rendered as written.
    Custom(String),
}

impl SqlType {
    /// The type name as rendered in DDL.
    pub fn as_str(&self) -> &str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Numeric => "NUMERIC",
            SqlType::Boolean => "BOOLEAN",
            SqlType::DateTime => "DATETIME",
            SqlType::Custom(name) => name,
        }
    }

    /// Whether the type name can be spliced into DDL.
    ///
    /// Accepts one or more words with an optional `(n)` or `(n, m)` size, as
    /// in `VARCHAR(255)` or `UNSIGNED BIG INT`.
    pub fn is_well_formed(&self) -> bool {
        let name = match self {
            SqlType::Custom(name) => name.as_str(),
            _ => return true,
        };

        let (words, size) = match name.split_once('(') {
            Some((words, rest)) => match rest.strip_suffix(')') {
                Some(size) => (words, Some(size)),
                None => return false,
            },
            None => (name, None),
        };

        let mut words = words.split_whitespace().peekable();
        if words.peek().is_none() {
            return false;
        }
        if !words.all(|w| is_identifier(w) && !is_reserved_word(w)) {
            return false;
        }

        size.map_or(true, |size| {
            let parts: Vec<&str> = size.split(',').map(str::trim).collect();
            parts.len() <= 2 && parts.iter().all(|p| is_signed_number(p))
        })
    }
}

fn is_signed_number(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => SqlType::Integer,
            "REAL" | "FLOAT" | "DOUBLE" => SqlType::Real,
            "TEXT" | "STRING" => SqlType::Text,
            "BLOB" => SqlType::Blob,
            "NUMERIC" => SqlType::Numeric,
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "DATETIME" => SqlType::DateTime,
            _ => SqlType::Custom(s.trim().to_string()),
        })
    }
}

impl From<String> for SqlType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for SqlType {
    fn from(s: &str) -> Self {
        SqlType::from(s.to_string())
    }
}

impl From<SqlType> for String {
    fn from(ty: SqlType) -> Self {
        ty.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(SqlType::from("text"), SqlType::Text);
        assert_eq!(SqlType::from("Int"), SqlType::Integer);
        assert_eq!(SqlType::from("bool"), SqlType::Boolean);
    }

    #[test]
    fn test_custom_type_kept_verbatim() {
        let ty = SqlType::from("VARCHAR(255)");
        assert_eq!(ty, SqlType::Custom("VARCHAR(255)".into()));
        assert_eq!(ty.to_string(), "VARCHAR(255)");
    }
}
