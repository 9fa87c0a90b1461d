//! Migration operation planning.
//!
//! Turns a classified [`TableDiff`] into an ordered list of [`SqlOperation`]s.
//! Rebuilding a table always takes four steps:
//!
//! 1. create a temporary table with the declared schema
//! 2. copy whatever data can be carried over
//! 3. drop the old table (the only critical step)
//! 4. rename the temporary table to the original name

use super::column::{create_table_as_sql, create_table_sql};
use super::diff::{DiffKind, TableDiff};
use super::introspect::LiveTable;
use crate::catalog::{FieldDef, TableSchema};
use crate::value::SqlValue;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Query used in place of a copy statement when nothing is copied.
pub const NO_COPY_QUERY: &str = "-- No compatible columns to copy";

/// Length of the random temporary table suffix.
const TEMP_SUFFIX_LEN: usize = 3;

/// One planned statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlOperation {
    /// What the statement does, shown to the operator.
    pub description: String,
    /// SQL text with positional `?` parameters.
    pub query: String,
    /// Bound parameters.
    pub params: Vec<SqlValue>,
    /// Whether executing the statement destroys data irreversibly.
    pub critical: bool,
}

impl SqlOperation {
    /// Create a non-critical operation without parameters.
    pub fn new(description: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            query: query.into(),
            params: Vec::new(),
            critical: false,
        }
    }

    /// Create a critical operation.
    pub fn critical(description: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            critical: true,
            ..Self::new(description, query)
        }
    }

    /// Attach bound parameters.
    pub fn with_params(mut self, params: Vec<SqlValue>) -> Self {
        self.params = params;
        self
    }

    /// Check if the query is only an SQL comment and must not be sent.
    pub fn is_comment(&self) -> bool {
        self.query.trim_start().starts_with("--")
    }
}

/// Generate a temporary table name `tmp_<table>_<xyz>`.
pub fn temp_table_name(table: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("tmp_{}_{}", table, suffix)
}

/// Builds operation lists for each classification.
pub struct Planner;

impl Planner {
    /// Single `CREATE TABLE IF NOT EXISTS` for a missing table.
    pub fn create(schema: &TableSchema) -> SqlOperation {
        SqlOperation::new(
            format!("Create new table '{}' with full schema", schema.name),
            create_table_sql(schema),
        )
    }

    /// One `ALTER TABLE .. ADD COLUMN` per missing plain column.
    pub fn additive(diff: &TableDiff) -> Vec<SqlOperation> {
        diff.added_columns()
            .map(|(field, definition)| {
                SqlOperation::new(
                    format!(
                        "Add column '{}' with definition: {}",
                        field.name, definition
                    ),
                    format!("ALTER TABLE {} ADD COLUMN {}", diff.table, definition),
                )
            })
            .collect()
    }

    /// Start a rebuild of `live` into `schema` through `tmp_table`.
    pub fn recreation(
        schema: &TableSchema,
        live: &LiveTable,
        tmp_table: String,
    ) -> RecreationDraft {
        let old_columns: Vec<String> = live.data_columns().map(|c| c.name.clone()).collect();

        // Live order, so the copy reads columns the way they are stored
        let common_columns: Vec<String> = old_columns
            .iter()
            .filter(|name| schema.has_field(name))
            .cloned()
            .collect();

        // Declared defaults fill new columns on their own
        let required_defaults: Vec<FieldDef> = if live.has_rows {
            schema
                .fields
                .iter()
                .filter(|f| !f.nullable && !f.has_default() && !live.has_column(&f.name))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let needs_mapping = common_columns.is_empty() && live.has_rows && !old_columns.is_empty();

        RecreationDraft {
            table: schema.name.clone(),
            tmp_table: tmp_table.clone(),
            create: SqlOperation::new(
                format!("Create temporary table '{}' with new schema", tmp_table),
                create_table_as_sql(&tmp_table, schema),
            ),
            old_columns,
            new_columns: schema.field_names().map(String::from).collect(),
            common_columns,
            required_defaults,
            needs_mapping,
        }
    }
}

/// Classification and previewed operations for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlan {
    /// The diff the plan was built from.
    pub diff: TableDiff,
    /// Operations as they would run without operator input.
    pub operations: Vec<SqlOperation>,
}

impl TablePlan {
    /// Table name.
    pub fn table(&self) -> &str {
        &self.diff.table
    }

    /// Classification of the change.
    pub fn kind(&self) -> DiffKind {
        self.diff.kind()
    }
}

/// Data-preservation decisions for a rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyResolution {
    /// `(new column, old column)` pairs, used only when no columns are common.
    pub mapping: Vec<(String, String)>,
    /// `(new column, value)` backfills for new NOT NULL columns.
    pub defaults: Vec<(String, SqlValue)>,
}

/// A table rebuild whose copy step may still need operator input.
#[derive(Debug, Clone, PartialEq)]
pub struct RecreationDraft {
    /// Table being rebuilt.
    pub table: String,
    /// Temporary table name.
    pub tmp_table: String,
    /// Creation of the temporary table.
    pub create: SqlOperation,
    /// Live columns other than the surrogate key, in physical order.
    pub old_columns: Vec<String>,
    /// Declared field names.
    pub new_columns: Vec<String>,
    /// Columns present on both sides, in live order.
    pub common_columns: Vec<String>,
    /// New NOT NULL fields that need a value for existing rows.
    pub required_defaults: Vec<FieldDef>,
    /// Whether the operator has to map old columns onto new ones.
    pub needs_mapping: bool,
}

impl RecreationDraft {
    /// Operations as they would run with no operator input.
    pub fn preview(&self) -> Vec<SqlOperation> {
        let mut copy = if self.common_columns.is_empty() {
            SqlOperation::new(
                "No compatible columns found - no data would be copied",
                NO_COPY_QUERY,
            )
        } else {
            self.copy_operation(&self.common_columns, &self.common_columns, &[])
        };
        if !self.required_defaults.is_empty() {
            let names: Vec<&str> = self
                .required_defaults
                .iter()
                .map(|field| field.name.as_str())
                .collect();
            copy.description
                .push_str(&format!(" (default values requested: {})", names.join(", ")));
        }
        self.assemble(copy)
    }

    /// Operations with the copy step built from `resolution`.
    pub fn finalize(&self, resolution: &CopyResolution) -> Vec<SqlOperation> {
        let copy = if !self.common_columns.is_empty() {
            self.copy_operation(&self.common_columns, &self.common_columns, &resolution.defaults)
        } else if !resolution.mapping.is_empty() || !resolution.defaults.is_empty() {
            let (targets, sources): (Vec<String>, Vec<String>) =
                resolution.mapping.iter().cloned().unzip();
            self.copy_operation(&targets, &sources, &resolution.defaults)
        } else if self.needs_mapping {
            SqlOperation::new("User chose to proceed without copying data", NO_COPY_QUERY)
        } else {
            SqlOperation::new(
                "No compatible columns found - no data will be copied",
                NO_COPY_QUERY,
            )
        };
        self.assemble(copy)
    }

    // A column that is both mapped and defaulted is listed once; the default
    // fills the rows where the mapped source is NULL.
    fn copy_operation(
        &self,
        targets: &[String],
        sources: &[String],
        defaults: &[(String, SqlValue)],
    ) -> SqlOperation {
        let mut columns: Vec<&str> = Vec::with_capacity(targets.len() + defaults.len());
        let mut values: Vec<String> = Vec::with_capacity(columns.capacity());
        let mut params = Vec::with_capacity(defaults.len());

        for (target, source) in targets.iter().zip(sources) {
            columns.push(target);
            match defaults.iter().find(|(column, _)| column == target) {
                Some((_, value)) => {
                    values.push(format!("COALESCE({}, ?)", source));
                    params.push(value.clone());
                }
                None => values.push(source.clone()),
            }
        }
        for (column, value) in defaults {
            if !targets.contains(column) {
                columns.push(column);
                values.push("?".to_string());
                params.push(value.clone());
            }
        }

        let mut parts = Vec::new();
        if !self.common_columns.is_empty() {
            parts.push(format!(
                "Copy compatible columns: {}",
                self.common_columns.join(", ")
            ));
        } else if !targets.is_empty() {
            let mapped: Vec<String> = targets
                .iter()
                .zip(sources)
                .map(|(new, old)| format!("{}→{}", old, new))
                .collect();
            parts.push(mapped.join(", "));
        }
        if !defaults.is_empty() {
            let filled: Vec<String> = defaults
                .iter()
                .map(|(column, value)| format!("{}={}", column, value))
                .collect();
            parts.push(format!("Default values: {}", filled.join(", ")));
        }

        SqlOperation::new(
            parts.join(", "),
            format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                self.tmp_table,
                columns.join(", "),
                values.join(", "),
                self.table
            ),
        )
        .with_params(params)
    }

    fn assemble(&self, copy: SqlOperation) -> Vec<SqlOperation> {
        vec![
            self.create.clone(),
            copy,
            SqlOperation::critical(
                format!("Drop old table '{}'", self.table),
                format!("DROP TABLE {}", self.table),
            ),
            SqlOperation::new(
                format!("Rename temporary table to '{}'", self.table),
                format!("ALTER TABLE {} RENAME TO {}", self.tmp_table, self.table),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DefaultValue, ForeignKeyRef, SqlType};
    use crate::migration::introspect::LiveColumn;

    fn live(columns: &[(&str, bool)], has_rows: bool) -> LiveTable {
        let mut all = vec![LiveColumn {
            name: "id".into(),
            sql_type: "INTEGER".into(),
            not_null: false,
        }];
        all.extend(columns.iter().map(|(name, not_null)| LiveColumn {
            name: name.to_string(),
            sql_type: "TEXT".into(),
            not_null: *not_null,
        }));
        LiveTable {
            name: "user".into(),
            columns: all,
            has_rows,
            ..LiveTable::default()
        }
    }

    fn user_schema() -> TableSchema {
        TableSchema::new("user")
            .with_field(FieldDef::required("name", SqlType::Text))
            .with_field(FieldDef::new("email", SqlType::Text).unique())
    }

    fn assert_recreation_shape(ops: &[SqlOperation]) {
        assert_eq!(ops.len(), 4);
        let critical: Vec<usize> = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| op.critical)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(critical, vec![2]);
        assert_eq!(ops[2].query, "DROP TABLE user");
    }

    #[test]
    fn test_create_plan() {
        let schema = TableSchema::new("tag")
            .with_field(FieldDef::required("name", SqlType::Text).unique())
            .with_field(FieldDef::new("nickname", SqlType::Text).unique())
            .with_field(
                FieldDef::new("owner_id", SqlType::Integer).references(ForeignKeyRef::table("user")),
            );
        let op = Planner::create(&schema);

        assert_eq!(op.description, "Create new table 'tag' with full schema");
        assert!(op.query.starts_with("CREATE TABLE IF NOT EXISTS tag ("));
        assert_eq!(op.query.matches("UNIQUE").count(), 2);
        assert_eq!(op.query.matches("FOREIGN KEY").count(), 1);
        assert!(!op.critical);
    }

    #[test]
    fn test_additive_plan() {
        let schema = user_schema()
            .with_field(FieldDef::new("bio", SqlType::Text))
            .with_field(
                FieldDef::new("score", SqlType::Integer).with_default(DefaultValue::Int(0)),
            );
        let mut table = live(&[("name", true), ("email", false)], true);
        table.unique_groups = vec![vec!["email".into()]];
        table.unique_fields = vec!["email".into()];

        let ops = Planner::additive(&TableDiff::compute(&schema, &table));
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].query, "ALTER TABLE user ADD COLUMN bio TEXT");
        assert_eq!(
            ops[1].description,
            "Add column 'score' with definition: score INTEGER DEFAULT 0"
        );
    }

    #[test]
    fn test_temp_table_name() {
        let name = temp_table_name("user");
        assert!(name.starts_with("tmp_user_"));
        assert_eq!(name.len(), "tmp_user_".len() + 3);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_recreation_copies_common_columns_in_live_order() {
        let schema = TableSchema::new("user")
            .with_field(FieldDef::new("email", SqlType::Text).unique())
            .with_field(FieldDef::required("name", SqlType::Text));
        let table = live(&[("name", false), ("legacy", false), ("email", false)], true);

        let draft = Planner::recreation(&schema, &table, "tmp_user_abc".into());
        assert_eq!(draft.common_columns, vec!["name", "email"]);
        assert!(!draft.needs_mapping);
        assert!(draft.required_defaults.is_empty());

        let ops = draft.finalize(&CopyResolution::default());
        assert_recreation_shape(&ops);
        assert_eq!(
            ops[1].query,
            "INSERT INTO tmp_user_abc (name, email) SELECT name, email FROM user"
        );
        assert_eq!(ops[1].description, "Copy compatible columns: name, email");
        assert_eq!(ops[3].query, "ALTER TABLE tmp_user_abc RENAME TO user");
    }

    #[test]
    fn test_recreation_binds_defaults() {
        let schema = user_schema().with_field(FieldDef::required("age", SqlType::Integer));
        let table = live(&[("name", false)], true);

        let draft = Planner::recreation(&schema, &table, "tmp_user_abc".into());
        assert_eq!(draft.required_defaults.len(), 1);
        assert_eq!(draft.required_defaults[0].name, "age");
        assert!(draft.preview()[1]
            .description
            .ends_with("(default values requested: age)"));

        let resolution = CopyResolution {
            mapping: Vec::new(),
            defaults: vec![("age".into(), SqlValue::from("30"))],
        };
        let ops = draft.finalize(&resolution);
        assert_recreation_shape(&ops);
        assert_eq!(
            ops[1].query,
            "INSERT INTO tmp_user_abc (name, age) SELECT name, ? FROM user"
        );
        assert_eq!(ops[1].params, vec![SqlValue::from("30")]);
        assert_eq!(
            ops[1].description,
            "Copy compatible columns: name, Default values: age='30'"
        );
    }

    #[test]
    fn test_declared_default_needs_no_prompt() {
        let schema = user_schema().with_field(
            FieldDef::required("role", SqlType::Text)
                .with_default(DefaultValue::Text("member".into())),
        );
        let draft = Planner::recreation(&schema, &live(&[("name", false)], true), "t".into());
        assert!(draft.required_defaults.is_empty());
    }

    #[test]
    fn test_empty_table_needs_no_input() {
        let schema =
            TableSchema::new("user").with_field(FieldDef::required("full_name", SqlType::Text));
        let draft = Planner::recreation(&schema, &live(&[("name", false)], false), "t".into());

        assert!(!draft.needs_mapping);
        assert!(draft.required_defaults.is_empty());
        assert!(draft.finalize(&CopyResolution::default())[1].is_comment());
    }

    #[test]
    fn test_recreation_with_mapping() {
        let schema = TableSchema::new("user")
            .with_field(FieldDef::new("full_name", SqlType::Text))
            .with_field(FieldDef::new("mail", SqlType::Text));
        let table = live(&[("name", false), ("email", false)], true);

        let draft = Planner::recreation(&schema, &table, "tmp_user_abc".into());
        assert!(draft.needs_mapping);
        assert_eq!(draft.old_columns, vec!["name", "email"]);

        let preview = draft.preview();
        assert_recreation_shape(&preview);
        assert!(preview[1].is_comment());

        let resolution = CopyResolution {
            mapping: vec![("full_name".into(), "name".into())],
            defaults: Vec::new(),
        };
        let ops = draft.finalize(&resolution);
        assert_eq!(
            ops[1].query,
            "INSERT INTO tmp_user_abc (full_name) SELECT name FROM user"
        );
        assert_eq!(ops[1].description, "name→full_name");

        let skipped = draft.finalize(&CopyResolution::default());
        assert_recreation_shape(&skipped);
        assert_eq!(skipped[1].query, NO_COPY_QUERY);
        assert_eq!(skipped[1].description, "User chose to proceed without copying data");
    }

    #[test]
    fn test_mapped_column_with_default_listed_once() {
        let schema =
            TableSchema::new("user").with_field(FieldDef::required("full_name", SqlType::Text));
        let table = live(&[("name", false)], true);

        let draft = Planner::recreation(&schema, &table, "tmp_user_abc".into());
        assert!(draft.needs_mapping);
        assert_eq!(draft.required_defaults[0].name, "full_name");

        let resolution = CopyResolution {
            mapping: vec![("full_name".into(), "name".into())],
            defaults: vec![("full_name".into(), SqlValue::from("fallback"))],
        };
        let ops = draft.finalize(&resolution);
        assert_eq!(
            ops[1].query,
            "INSERT INTO tmp_user_abc (full_name) SELECT COALESCE(name, ?) FROM user"
        );
        assert_eq!(ops[1].params, vec![SqlValue::from("fallback")]);
    }
}
