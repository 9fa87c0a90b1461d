//! Table migration entry point.

use super::config::MigrationConfig;
use super::controller::ExecutionController;
use super::diff::{DiffKind, TableDiff};
use super::display;
use super::error::MigrationError;
use super::introspect::{LiveTable, SchemaIntrospector};
use super::operator::Operator;
use super::plan::{temp_table_name, CopyResolution, Planner, TablePlan};
use super::report::{MigrationOutcome, MigrationReport};
use super::resolve::{resolve_defaults, resolve_mapping};
use crate::catalog::{Catalog, TableSchema};
use crate::database::Database;
use tracing::{debug, error, info, warn};

/// Brings live tables in line with their declarations.
///
/// Each call re-reads the live schema, classifies the difference, plans the
/// operations, and then either previews them (dry run) or runs them behind
/// operator confirmation.
pub struct Migrator<D: Database, O: Operator> {
    db: D,
    operator: O,
    config: MigrationConfig,
}

impl<D: Database, O: Operator> Migrator<D, O> {
    /// Create a migrator.
    pub fn new(db: D, operator: O, config: MigrationConfig) -> Self {
        Self {
            db,
            operator,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the database.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// Get the operator.
    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Consume the migrator and return the operator.
    pub fn into_operator(self) -> O {
        self.operator
    }

    fn snapshot(&self, schema: &TableSchema) -> Result<LiveTable, MigrationError> {
        schema.validate()?;
        Ok(SchemaIntrospector::new(&self.db).snapshot(&schema.name)?)
    }

    /// Classify one table and preview its operations without prompting.
    pub fn plan_table(&self, schema: &TableSchema) -> Result<TablePlan, MigrationError> {
        let live = self.snapshot(schema)?;
        let diff = TableDiff::compute(schema, &live);

        let operations = match diff.kind() {
            DiffKind::NoChange => Vec::new(),
            DiffKind::Create => vec![Planner::create(schema)],
            DiffKind::Additive => Planner::additive(&diff),
            DiffKind::Recreate => {
                let tmp_table = self.free_temp_name(&schema.name)?;
                Planner::recreation(schema, &live, tmp_table).preview()
            }
        };

        Ok(TablePlan { diff, operations })
    }

    /// Plan every table of a catalog, referenced tables first.
    pub fn plan_catalog(&self, catalog: &Catalog) -> Result<Vec<TablePlan>, MigrationError> {
        catalog
            .migration_order()?
            .into_iter()
            .map(|schema| self.plan_table(schema))
            .collect()
    }

    /// Migrate one table.
    ///
    /// In dry-run mode a table that needs rebuilding returns
    /// [`MigrationError::RecreationBlocked`] after its plan is shown.
    pub fn migrate_table(
        &mut self,
        schema: &TableSchema,
    ) -> Result<MigrationReport, MigrationError> {
        let live = self.snapshot(schema)?;
        let diff = TableDiff::compute(schema, &live);
        let kind = diff.kind();
        let table = schema.name.as_str();
        info!(table, %kind, "table classified");

        let outcome = match kind {
            DiffKind::NoChange => {
                debug!(table, "table is up to date");
                MigrationOutcome::Unchanged
            }
            DiffKind::Create => self.create_table(schema)?,
            DiffKind::Additive => self.update_table(&diff)?,
            DiffKind::Recreate => self.recreate_table(schema, &live, &diff)?,
        };

        info!(table, %outcome, "migration finished");
        Ok(MigrationReport::new(table, kind, outcome))
    }

    /// Migrate every table of a catalog, referenced tables first.
    ///
    /// In dry-run mode all tables are previewed before a blocked recreation is
    /// reported. Any other error stops at the failing table.
    pub fn migrate_catalog(
        &mut self,
        catalog: &Catalog,
    ) -> Result<Vec<MigrationReport>, MigrationError> {
        let mut reports = Vec::with_capacity(catalog.len());
        let mut blocked = None;

        for schema in catalog.migration_order()? {
            match self.migrate_table(schema) {
                Ok(report) => reports.push(report),
                Err(e @ MigrationError::RecreationBlocked { .. }) => {
                    if blocked.is_none() {
                        blocked = Some(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        match blocked {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    /// Migrate one table, exiting the process with
    /// [`MigrationError::exit_code`] on failure.
    pub fn migrate_table_or_exit(&mut self, schema: &TableSchema) -> MigrationReport {
        match self.migrate_table(schema) {
            Ok(report) => report,
            Err(e) => self.exit(e),
        }
    }

    /// Migrate a catalog, exiting the process with
    /// [`MigrationError::exit_code`] on failure.
    pub fn migrate_catalog_or_exit(&mut self, catalog: &Catalog) -> Vec<MigrationReport> {
        match self.migrate_catalog(catalog) {
            Ok(reports) => reports,
            Err(e) => self.exit(e),
        }
    }

    fn exit(&mut self, e: MigrationError) -> ! {
        error!(error = %e, code = e.exit_code(), "migration aborted");
        let _ = display::failure(&mut self.operator, &e.to_string());
        std::process::exit(e.exit_code())
    }

    fn create_table(&mut self, schema: &TableSchema) -> Result<MigrationOutcome, MigrationError> {
        let operation = Planner::create(schema);
        let outcome = ExecutionController::new(&self.db, &mut self.operator, &self.config)
            .run_single(&schema.name, &operation)?;

        if outcome == MigrationOutcome::Previewed {
            display::note(
                &mut self.operator,
                &format!("[DRY RUN] Would create new table '{}'", schema.name),
            )?;
        }
        Ok(outcome)
    }

    fn update_table(&mut self, diff: &TableDiff) -> Result<MigrationOutcome, MigrationError> {
        let operations = Planner::additive(diff);
        let outcome = ExecutionController::new(&self.db, &mut self.operator, &self.config)
            .run_batch(&diff.table, &operations, false)?;

        match outcome {
            MigrationOutcome::Previewed => display::note(
                &mut self.operator,
                &format!(
                    "[DRY RUN] Would update table '{}' with {} operations",
                    diff.table,
                    operations.len()
                ),
            )?,
            ref o if o.is_applied() => display::success(
                &mut self.operator,
                &format!("Table '{}' successfully updated", diff.table),
            )?,
            _ => {}
        }
        Ok(outcome)
    }

    fn recreate_table(
        &mut self,
        schema: &TableSchema,
        live: &LiveTable,
        diff: &TableDiff,
    ) -> Result<MigrationOutcome, MigrationError> {
        let table = schema.name.as_str();
        let tmp_table = self.free_temp_name(table)?;
        let draft = Planner::recreation(schema, live, tmp_table);

        display::warning(
            &mut self.operator,
            &format!("Table '{}' has to be recreated:", table),
        )?;
        for reason in diff.recreation_reasons() {
            self.operator.say(&format!("  - {}", reason.describe()))?;
        }

        if self.config.is_dry_run() {
            ExecutionController::new(&self.db, &mut self.operator, &self.config)
                .run_batch(table, &draft.preview(), false)?;
            display::note(
                &mut self.operator,
                &format!("[DRY RUN] Would recreate table '{}' with schema changes", table),
            )?;
            warn!(table, "recreation blocked in dry-run mode");
            return Err(MigrationError::RecreationBlocked {
                table: table.to_string(),
            });
        }

        let defaults = resolve_defaults(&mut self.operator, table, &draft.required_defaults)?;

        let mapping = if draft.needs_mapping {
            match resolve_mapping(
                &mut self.operator,
                table,
                &draft.old_columns,
                &draft.new_columns,
            )? {
                Some(mapping) => mapping,
                None => {
                    display::failure(&mut self.operator, "Migration cancelled by user")?;
                    warn!(table, "recreation cancelled during column mapping");
                    return Ok(MigrationOutcome::Declined);
                }
            }
        } else {
            Vec::new()
        };

        let operations = draft.finalize(&CopyResolution { mapping, defaults });
        let outcome = ExecutionController::new(&self.db, &mut self.operator, &self.config)
            .run_rebuild(table, &operations)?;

        if outcome.is_applied() {
            display::success(
                &mut self.operator,
                &format!("Table '{}' successfully recreated", table),
            )?;
        }
        Ok(outcome)
    }

    fn free_temp_name(&self, table: &str) -> Result<String, MigrationError> {
        let introspector = SchemaIntrospector::new(&self.db);
        for _ in 0..self.config.temp_name_attempts {
            let name = temp_table_name(table);
            if introspector.table_columns(&name)?.is_empty() {
                return Ok(name);
            }
            debug!(table, name = %name, "temporary table name taken");
        }
        Err(MigrationError::TempNameExhausted {
            table: table.to_string(),
            attempts: self.config.temp_name_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, SqlType};
    use crate::database::SqliteDatabase;
    use crate::migration::operator::TerminalOperator;
    use std::io::Cursor;

    type ScriptedOperator = TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>;

    fn migrator(
        config: MigrationConfig,
        input: &str,
    ) -> Migrator<SqliteDatabase, ScriptedOperator> {
        colored::control::set_override(false);
        let db = SqliteDatabase::open_in_memory().unwrap();
        let operator = TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        Migrator::new(db, operator, config)
    }

    fn note_schema() -> TableSchema {
        TableSchema::new("note").with_field(FieldDef::required("body", SqlType::Text))
    }

    #[test]
    fn test_plan_table_for_missing_table() {
        let m = migrator(MigrationConfig::dry_run(), "");
        let plan = m.plan_table(&note_schema()).unwrap();

        assert_eq!(plan.kind(), DiffKind::Create);
        assert_eq!(plan.table(), "note");
        assert_eq!(plan.operations.len(), 1);
    }

    #[test]
    fn test_dry_run_create_returns_normally() {
        let mut m = migrator(MigrationConfig::dry_run(), "");
        let report = m.migrate_table(&note_schema()).unwrap();

        assert_eq!(report.kind, DiffKind::Create);
        assert_eq!(report.outcome, MigrationOutcome::Previewed);
        assert_eq!(m.plan_table(&note_schema()).unwrap().kind(), DiffKind::Create);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut m = migrator(MigrationConfig::execute(), "");
        let schema = TableSchema::new("bad name");
        assert!(matches!(
            m.migrate_table(&schema),
            Err(MigrationError::Database(_))
        ));
    }

    #[test]
    fn test_free_temp_name() {
        let m = migrator(MigrationConfig::execute().with_temp_name_attempts(3), "");
        assert!(m.free_temp_name("note").unwrap().starts_with("tmp_note_"));

        let m = migrator(MigrationConfig::execute().with_temp_name_attempts(0), "");
        // Clamped to one attempt, which finds a free name.
        assert_eq!(m.config().temp_name_attempts, 1);
        assert!(m.free_temp_name("note").is_ok());
    }
}
