//! Confirmation and execution of planned operations.
//!
//! In dry-run mode operations are only rendered. In execution mode a single
//! operation needs a yes/no answer and a batch offers execute all, step by
//! step, or skip.

use super::config::MigrationConfig;
use super::display;
use super::error::MigrationError;
use super::operator::Operator;
use super::plan::SqlOperation;
use super::report::MigrationOutcome;
use crate::database::{Database, Row};
use crate::error::Error;
use colored::Colorize;
use tracing::{debug, error, info, warn};

/// Gates operations behind operator confirmation and runs them.
pub struct ExecutionController<'a, D: Database, O: Operator> {
    db: &'a D,
    operator: &'a mut O,
    config: &'a MigrationConfig,
    // Foreign key violations present before a rebuild started.
    fk_baseline: Option<usize>,
}

enum BatchChoice {
    All,
    Step,
    Skip,
}

impl<'a, D: Database, O: Operator> ExecutionController<'a, D, O> {
    /// Create a controller.
    pub fn new(db: &'a D, operator: &'a mut O, config: &'a MigrationConfig) -> Self {
        Self {
            db,
            operator,
            config,
            fk_baseline: None,
        }
    }

    /// Run one operation.
    pub fn run_single(
        &mut self,
        table: &str,
        operation: &SqlOperation,
    ) -> Result<MigrationOutcome, MigrationError> {
        if self.config.is_dry_run() {
            display::dry_run_banner(self.operator)?;
            display::show_operation(self.operator, table, operation, true)?;
            return Ok(MigrationOutcome::Previewed);
        }

        display::show_operation(self.operator, table, operation, false)?;
        if !self.confirm_execute()? {
            display::failure(self.operator, "Operation cancelled by user")?;
            warn!(table, operation = %operation.description, "operation declined");
            return Ok(MigrationOutcome::Declined);
        }

        match self.execute(table, operation) {
            Ok(()) => {
                display::success(self.operator, "Operation completed successfully")?;
                Ok(MigrationOutcome::Applied {
                    executed: 1,
                    failed: 0,
                })
            }
            Err(e) => {
                display::failure(self.operator, &format!("Operation failed: {}", e))?;
                Err(e)
            }
        }
    }

    /// Run a batch of operations.
    ///
    /// With `atomic`, executing the whole batch at once happens inside a single
    /// transaction that is rolled back on the first failure.
    pub fn run_batch(
        &mut self,
        table: &str,
        operations: &[SqlOperation],
        atomic: bool,
    ) -> Result<MigrationOutcome, MigrationError> {
        if operations.is_empty() {
            return Ok(MigrationOutcome::Unchanged);
        }

        if self.config.is_dry_run() {
            display::dry_run_banner(self.operator)?;
            display::show_batch(self.operator, table, operations, true)?;
            return Ok(MigrationOutcome::Previewed);
        }

        display::show_batch(self.operator, table, operations, false)?;
        match self.ask_batch_choice()? {
            BatchChoice::All => self.execute_all(table, operations, atomic),
            BatchChoice::Step => self.execute_steps(table, operations),
            BatchChoice::Skip => {
                display::warning(self.operator, "Skipped all operations")?;
                warn!(table, "batch declined");
                Ok(MigrationOutcome::Declined)
            }
        }
    }

    /// Run the operations of a table rebuild.
    ///
    /// Dropping a table that other rows reference fails while SQLite enforces
    /// foreign keys, so enforcement is switched off around the batch and
    /// restored afterwards. The rebuild must not add foreign key violations;
    /// with atomic recreation enabled such a rebuild is rolled back.
    pub fn run_rebuild(
        &mut self,
        table: &str,
        operations: &[SqlOperation],
    ) -> Result<MigrationOutcome, MigrationError> {
        if self.config.is_dry_run() || operations.is_empty() {
            return self.run_batch(table, operations, false);
        }

        let enforced = self.foreign_keys_enforced(table)?;
        if enforced {
            self.set_foreign_keys(table, false)?;
        }
        let baseline = match self.foreign_key_violations(table) {
            Ok(rows) => rows.len(),
            Err(e) => {
                if enforced {
                    if let Err(restore) = self.set_foreign_keys(table, true) {
                        error!(table, error = %restore, "could not re-enable foreign keys");
                    }
                }
                return Err(e);
            }
        };
        debug!(table, enforced, baseline, "foreign key enforcement paused for rebuild");

        self.fk_baseline = Some(baseline);
        let result = self.run_batch(table, operations, self.config.atomic_recreation);
        self.fk_baseline = None;

        let restored = if enforced {
            self.set_foreign_keys(table, true)
        } else {
            Ok(())
        };
        let outcome = result?;
        restored?;
        Ok(outcome)
    }

    fn foreign_keys_enforced(&mut self, table: &str) -> Result<bool, MigrationError> {
        let pragma = SqlOperation::new("Read foreign key enforcement", "PRAGMA foreign_keys");
        let row = self
            .db
            .fetch_one(&pragma.query, &[])
            .map_err(|source| self.statement_failed(table, &pragma, source))?;
        match row {
            Some(row) => Ok(row.get::<bool>("foreign_keys")?),
            None => Ok(false),
        }
    }

    fn set_foreign_keys(&mut self, table: &str, on: bool) -> Result<(), MigrationError> {
        let pragma = if on {
            SqlOperation::new("Enable foreign keys", "PRAGMA foreign_keys = ON")
        } else {
            SqlOperation::new("Disable foreign keys", "PRAGMA foreign_keys = OFF")
        };
        self.execute(table, &pragma)
    }

    fn foreign_key_violations(&mut self, table: &str) -> Result<Vec<Row>, MigrationError> {
        let check = SqlOperation::new("Check foreign keys", "PRAGMA foreign_key_check");
        self.db
            .fetch_many(&check.query, &[])
            .map_err(|source| self.statement_failed(table, &check, source))
    }

    /// Fails if the running rebuild added foreign key violations.
    fn verify_foreign_keys(&mut self, table: &str) -> Result<(), MigrationError> {
        let Some(baseline) = self.fk_baseline else {
            return Ok(());
        };
        let rows = self.foreign_key_violations(table)?;
        if rows.len() <= baseline {
            return Ok(());
        }

        let child = rows
            .first()
            .and_then(|row| row.get::<String>("table").ok())
            .unwrap_or_default();
        let violations = rows.len() - baseline;
        error!(table, child = %child, violations, "rebuild broke foreign keys");
        Err(MigrationError::ForeignKeyViolation {
            table: table.to_string(),
            child,
            violations,
        })
    }

    fn ask_batch_choice(&mut self) -> Result<BatchChoice, MigrationError> {
        self.operator.say("")?;
        self.operator.say(&format!("{}", "Options:".bold()))?;
        let prompt = format!("{}", "Choose an option".green());
        Ok(match self.operator.choose(&prompt, &display::batch_choices())? {
            Some(0) => BatchChoice::All,
            Some(1) => BatchChoice::Step,
            _ => BatchChoice::Skip,
        })
    }

    fn confirm_execute(&mut self) -> Result<bool, MigrationError> {
        let prompt = format!("{}", "Execute this operation?".green());
        Ok(self.operator.confirm(&prompt, false)?)
    }

    fn execute_all(
        &mut self,
        table: &str,
        operations: &[SqlOperation],
        atomic: bool,
    ) -> Result<MigrationOutcome, MigrationError> {
        if atomic {
            let begin = SqlOperation::new("Begin transaction", "BEGIN IMMEDIATE");
            self.execute(table, &begin)?;
        }

        let mut executed = 0;
        for operation in operations.iter().filter(|op| !op.is_comment()) {
            if let Err(e) = self.execute(table, operation) {
                if atomic {
                    self.rollback(table);
                    let message = format!(
                        "'{}' failed, all changes rolled back: {}",
                        operation.description, e
                    );
                    display::failure(self.operator, &message)?;
                } else {
                    let message = format!(
                        "'{}' failed after {} statements: {}",
                        operation.description, executed, e
                    );
                    display::failure(self.operator, &message)?;
                }
                return Err(e);
            }
            executed += 1;
        }

        if let Err(e) = self.verify_foreign_keys(table) {
            if atomic {
                self.rollback(table);
                let message = format!("{}, all changes rolled back", e);
                display::failure(self.operator, &message)?;
            } else {
                display::failure(self.operator, &e.to_string())?;
            }
            return Err(e);
        }

        if atomic {
            let commit = SqlOperation::new("Commit transaction", "COMMIT");
            if let Err(e) = self.execute(table, &commit) {
                self.rollback(table);
                let message = format!("Commit failed, all changes rolled back: {}", e);
                display::failure(self.operator, &message)?;
                return Err(e);
            }
        }

        info!(table, executed, "batch applied");
        Ok(MigrationOutcome::Applied {
            executed,
            failed: 0,
        })
    }

    fn execute_steps(
        &mut self,
        table: &str,
        operations: &[SqlOperation],
    ) -> Result<MigrationOutcome, MigrationError> {
        let mut executed = 0;
        let mut failed = 0;

        for (i, operation) in operations.iter().enumerate() {
            if operation.is_comment() {
                display::note(
                    self.operator,
                    &format!("Step {}: {} (nothing to execute)", i + 1, operation.description),
                )?;
                continue;
            }

            display::show_operation(self.operator, table, operation, false)?;
            if !self.confirm_execute()? {
                display::failure(self.operator, "Operation cancelled by user")?;
                warn!(table, step = i + 1, "step declined");
                if executed == 0 && failed == 0 {
                    return Ok(MigrationOutcome::Declined);
                }
                return Ok(MigrationOutcome::Stopped {
                    executed,
                    reason: format!("step {} '{}' declined", i + 1, operation.description),
                });
            }

            match self.execute(table, operation) {
                Ok(()) => {
                    display::success(self.operator, "Operation completed successfully")?;
                    executed += 1;
                }
                Err(e) => {
                    failed += 1;
                    display::failure(self.operator, &format!("Operation failed: {}", e))?;
                    let prompt = format!("{}", "Continue with remaining operations?".yellow());
                    if !self.operator.confirm(&prompt, false)? {
                        return Ok(MigrationOutcome::Stopped {
                            executed,
                            reason: format!("step {} '{}' failed", i + 1, operation.description),
                        });
                    }
                }
            }
        }

        if executed > 0 {
            if let Err(e) = self.verify_foreign_keys(table) {
                display::failure(self.operator, &e.to_string())?;
                return Err(e);
            }
        }
        Ok(MigrationOutcome::Applied { executed, failed })
    }

    fn execute(&mut self, table: &str, operation: &SqlOperation) -> Result<(), MigrationError> {
        self.db
            .execute(&operation.query, &operation.params)
            .map_err(|source| self.statement_failed(table, operation, source))
    }

    fn statement_failed(
        &self,
        table: &str,
        operation: &SqlOperation,
        source: Error,
    ) -> MigrationError {
        error!(
            table,
            operation = %operation.description,
            error = %source,
            "statement failed"
        );
        MigrationError::StatementFailed {
            table: table.to_string(),
            description: operation.description.clone(),
            query: operation.query.clone(),
            source,
        }
    }

    fn rollback(&mut self, table: &str) {
        if let Err(e) = self.db.execute("ROLLBACK", &[]) {
            error!(table, error = %e, "rollback failed");
        } else {
            warn!(table, "transaction rolled back");
        }
    }
}
