//! Field definitions for tables.

use super::types::SqlType;
use crate::catalog::PRIMARY_KEY_COLUMN;
use serde::{Deserialize, Serialize};

/// A field (column) definition within a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Declared SQL type.
    #[serde(rename = "type")]
    pub sql_type: SqlType,
    /// Whether the column accepts NULL. Fields are nullable unless declared otherwise.
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    /// Whether the column carries a single-column UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value used by the database when an insert omits the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Foreign key reference.
    #[serde(default, rename = "references", skip_serializing_if = "Option::is_none")]
    pub reference: Option<ForeignKeyRef>,
}

fn nullable_by_default() -> bool {
    true
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Null value.
    Null,
    /// Boolean value, stored as 1/0.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// SQL expression evaluated by the database at insert time.
    Expression {
        /// Expression source, e.g. `CURRENT_TIMESTAMP` or `lower(hex(randomblob(4)))`.
        expression: String,
    },
}

impl DefaultValue {
    /// Default to the insert timestamp.
    pub fn current_timestamp() -> Self {
        DefaultValue::Expression {
            expression: "CURRENT_TIMESTAMP".into(),
        }
    }

    /// Default to an arbitrary SQL expression.
    pub fn expression(expression: impl Into<String>) -> Self {
        DefaultValue::Expression {
            expression: expression.into(),
        }
    }

    /// Render as the operand of a `DEFAULT` clause.
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::Int(v) => v.to_string(),
            DefaultValue::Float(v) => v.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Expression { expression } => {
                let keyword = expression.trim().to_ascii_uppercase();
                match keyword.as_str() {
                    "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME" => keyword,
                    _ => format!("({})", expression.trim()),
                }
            }
        }
    }
}

/// Target of a foreign key.
///
/// In declaration files a bare string names the table and implies the `id` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ForeignKeySpec")]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ForeignKeySpec {
    Table(String),
    Full { table: String, key: String },
}

impl From<ForeignKeySpec> for ForeignKeyRef {
    fn from(spec: ForeignKeySpec) -> Self {
        match spec {
            ForeignKeySpec::Table(table) => ForeignKeyRef::table(table),
            ForeignKeySpec::Full { table, key } => ForeignKeyRef { table, key },
        }
    }
}

impl ForeignKeyRef {
    /// Reference the surrogate primary key of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: PRIMARY_KEY_COLUMN.to_string(),
        }
    }

    /// Reference an explicit column of `table`.
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

impl FieldDef {
    /// Create a new nullable, non-unique field.
    pub fn new(name: impl Into<String>, sql_type: impl Into<SqlType>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            unique: false,
            default: None,
            reference: None,
        }
    }

    /// Create a NOT NULL field.
    pub fn required(name: impl Into<String>, sql_type: impl Into<SqlType>) -> Self {
        Self::new(name, sql_type).not_null()
    }

    /// Mark as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as UNIQUE.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Add a foreign key reference.
    pub fn references(mut self, reference: ForeignKeyRef) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Check if this field has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::new("author_id", SqlType::Integer)
            .not_null()
            .references(ForeignKeyRef::table("user"));

        assert_eq!(field.name, "author_id");
        assert!(!field.nullable);
        assert!(!field.unique);
        assert_eq!(field.reference.as_ref().unwrap().key, "id");
    }

    #[test]
    fn test_fields_are_nullable_by_default() {
        let field: FieldDef = serde_json::from_str(r#"{"name": "bio", "type": "text"}"#).unwrap();

        assert!(field.nullable);
        assert!(!field.unique);
        assert!(!field.has_default());
        assert_eq!(field.sql_type, SqlType::Text);
    }

    #[test]
    fn test_reference_shorthand() {
        let short: FieldDef =
            serde_json::from_str(r#"{"name": "tag_id", "type": "integer", "references": "tag"}"#)
                .unwrap();
        let full: FieldDef = serde_json::from_str(
            r#"{"name": "tag_id", "type": "integer", "references": {"table": "tag", "key": "code"}}"#,
        )
        .unwrap();

        assert_eq!(short.reference, Some(ForeignKeyRef::new("tag", "id")));
        assert_eq!(full.reference, Some(ForeignKeyRef::new("tag", "code")));
    }

    #[test]
    fn test_default_values_from_json() {
        let parse = |json: &str| -> DefaultValue { serde_json::from_str(json).unwrap() };

        assert_eq!(parse("true"), DefaultValue::Bool(true));
        assert_eq!(parse("7"), DefaultValue::Int(7));
        assert_eq!(parse("1.5"), DefaultValue::Float(1.5));
        assert_eq!(parse(r#""draft""#), DefaultValue::Text("draft".into()));
        assert_eq!(
            parse(r#"{"expression": "CURRENT_TIMESTAMP"}"#),
            DefaultValue::current_timestamp()
        );
    }

    #[test]
    fn test_default_rendering() {
        assert_eq!(DefaultValue::Bool(false).to_sql(), "0");
        assert_eq!(DefaultValue::Text("o'clock".into()).to_sql(), "'o''clock'");
        assert_eq!(DefaultValue::current_timestamp().to_sql(), "CURRENT_TIMESTAMP");
        assert_eq!(
            DefaultValue::expression("lower(hex(randomblob(4)))").to_sql(),
            "(lower(hex(randomblob(4))))"
        );
    }
}
