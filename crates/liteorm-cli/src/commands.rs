//! Subcommand implementations.

use crate::formatter::{self, OutputFormat};
use anyhow::{bail, Context};
use colored::Colorize;
use liteorm_core::migration::{MigrationConfig, MigrationMode, SchemaIntrospector, TablePlan};
use liteorm_core::{Catalog, Migrator, SqliteDatabase, TableSchema, TerminalOperator};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Read and validate a JSON schema declaration.
pub fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let catalog = Catalog::from_json_str(&json)
        .with_context(|| format!("invalid schema file {}", path.display()))?;
    info!(path = %path.display(), tables = catalog.len(), "schema loaded");
    Ok(catalog)
}

/// Migration settings from the environment, overridden by flags.
pub fn migration_config(confirm: bool, no_atomic: bool) -> MigrationConfig {
    let mut config = MigrationConfig::from_env();
    if confirm {
        config = config.with_mode(MigrationMode::Execute);
    }
    if no_atomic {
        config = config.with_atomic_recreation(false);
    }
    config
}

fn open_database(path: &Path) -> anyhow::Result<SqliteDatabase> {
    SqliteDatabase::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn select<'a>(catalog: &'a Catalog, table: &str) -> anyhow::Result<&'a TableSchema> {
    match catalog.get(table) {
        Some(schema) => Ok(schema),
        None => bail!("table '{}' is not declared in the schema", table),
    }
}

/// Migrate the catalog, or one table of it, prompting on the terminal.
///
/// Exits the process with the migration error's exit code on failure.
pub fn migrate(
    database: &Path,
    catalog: &Catalog,
    table: Option<&str>,
    config: MigrationConfig,
) -> anyhow::Result<()> {
    let db = open_database(database)?;
    let mut migrator = Migrator::new(db, TerminalOperator::stdio(), config);

    let reports = match table {
        Some(name) => vec![migrator.migrate_table_or_exit(select(catalog, name)?)],
        None => migrator.migrate_catalog_or_exit(catalog),
    };

    println!();
    for report in reports {
        println!("{} {}", "•".blue(), report);
    }
    Ok(())
}

/// Print what a migration would do without prompting or executing.
pub fn plan<W: Write>(
    database: &Path,
    catalog: &Catalog,
    table: Option<&str>,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    let db = open_database(database)?;
    let migrator = Migrator::new(
        db,
        TerminalOperator::new(io::empty(), io::sink()),
        MigrationConfig::dry_run(),
    );

    let plans: Vec<TablePlan> = match table {
        Some(name) => vec![migrator.plan_table(select(catalog, name)?)?],
        None => migrator.plan_catalog(catalog)?,
    };

    writeln!(out, "{}", formatter::format_plans(&plans, format))?;
    Ok(())
}

/// Print the live columns and unique indexes of a table.
pub fn inspect<W: Write>(
    database: &Path,
    table: &str,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    let db = open_database(database)?;
    let live = SchemaIntrospector::new(&db).snapshot(table)?;
    if !live.exists() {
        bail!("table '{}' does not exist", table);
    }

    writeln!(out, "{}", formatter::format_live_table(&live, format))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use liteorm_core::Database;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"{
        "tables": [
            {
                "name": "post",
                "fields": [
                    { "name": "title", "type": "text", "nullable": false },
                    { "name": "author_id", "type": "integer", "references": "user" }
                ]
            },
            {
                "name": "user",
                "fields": [
                    { "name": "name", "type": "text", "nullable": false },
                    { "name": "email", "type": "text", "unique": true }
                ]
            }
        ]
    }"#;

    struct TestContext {
        dir: TempDir,
    }

    impl TestContext {
        fn new() -> Self {
            colored::control::set_override(false);
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
            Self { dir }
        }

        fn schema_path(&self) -> std::path::PathBuf {
            self.dir.path().join("schema.json")
        }

        fn db_path(&self) -> std::path::PathBuf {
            self.dir.path().join("app.db")
        }

        fn setup(&self, sql: &[&str]) {
            let db = SqliteDatabase::open(self.db_path()).unwrap();
            for statement in sql {
                db.execute(statement, &[]).unwrap();
            }
        }
    }

    #[test]
    fn test_load_catalog() {
        let ctx = TestContext::new();
        let catalog = load_catalog(&ctx.schema_path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("user").unwrap().get_field("email").unwrap().unique);
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let ctx = TestContext::new();
        let err = load_catalog(&ctx.dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read schema file"));
    }

    #[test]
    fn test_plan_orders_referenced_tables_first() {
        let ctx = TestContext::new();
        let catalog = load_catalog(&ctx.schema_path()).unwrap();

        let mut out = Vec::new();
        plan(&ctx.db_path(), &catalog, None, OutputFormat::Json, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["table"], "user");
        assert_eq!(value[1]["table"], "post");
        assert_eq!(value[1]["kind"], "create");
    }

    #[test]
    fn test_plan_recreation_does_not_touch_database() {
        let ctx = TestContext::new();
        ctx.setup(&[
            "CREATE TABLE user (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
            "INSERT INTO user (name) VALUES ('ada')",
        ]);
        let catalog = load_catalog(&ctx.schema_path()).unwrap();

        let mut out = Vec::new();
        plan(&ctx.db_path(), &catalog, Some("user"), OutputFormat::Table, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("user (recreate)"));
        assert!(text.contains("column 'name' becomes NOT NULL"));
        assert!(text.contains("DROP TABLE user"));

        let db = SqliteDatabase::open(ctx.db_path()).unwrap();
        let columns = SchemaIntrospector::new(&db).table_columns("user").unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_plan_unknown_table() {
        let ctx = TestContext::new();
        let catalog = load_catalog(&ctx.schema_path()).unwrap();

        let mut out = Vec::new();
        let err = plan(&ctx.db_path(), &catalog, Some("nope"), OutputFormat::Table, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("not declared"));
    }

    #[test]
    fn test_inspect() {
        let ctx = TestContext::new();
        ctx.setup(&[
            "CREATE TABLE tag (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE)",
        ]);

        let mut out = Vec::new();
        inspect(&ctx.db_path(), "tag", OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["columns"][1]["name"], "name");
        assert_eq!(value["columns"][1]["not_null"], true);
        assert_eq!(value["columns"][1]["unique"], true);

        let mut out = Vec::new();
        assert!(inspect(&ctx.db_path(), "missing", OutputFormat::Table, &mut out).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let config = migration_config(true, true);
        assert_eq!(config.mode, MigrationMode::Execute);
        assert!(!config.atomic_recreation);
    }
}
