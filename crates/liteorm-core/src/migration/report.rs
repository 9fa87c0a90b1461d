//! Per-table migration results.

use super::diff::DiffKind;
use std::fmt;

/// What happened to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Nothing to do.
    Unchanged,
    /// Dry run: operations were shown, nothing was executed.
    Previewed,
    /// Operations ran. `failed` counts steps that failed in step-by-step mode
    /// after which the operator chose to continue.
    Applied {
        /// Statements executed successfully.
        executed: usize,
        /// Statements that failed.
        failed: usize,
    },
    /// The operator declined before anything ran.
    Declined,
    /// Step-by-step execution ended early.
    Stopped {
        /// Statements executed before stopping.
        executed: usize,
        /// Why execution stopped.
        reason: String,
    },
}

impl MigrationOutcome {
    /// Check if every planned statement ran.
    pub fn is_applied(&self) -> bool {
        matches!(self, MigrationOutcome::Applied { failed: 0, .. })
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::Unchanged => write!(f, "unchanged"),
            MigrationOutcome::Previewed => write!(f, "previewed"),
            MigrationOutcome::Applied { executed, failed: 0 } => {
                write!(f, "applied ({} statements)", executed)
            }
            MigrationOutcome::Applied { executed, failed } => {
                write!(f, "applied with errors ({} ok, {} failed)", executed, failed)
            }
            MigrationOutcome::Declined => write!(f, "declined"),
            MigrationOutcome::Stopped { executed, reason } => {
                write!(f, "stopped after {} statements: {}", executed, reason)
            }
        }
    }
}

/// Result of migrating one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Table name.
    pub table: String,
    /// Classification of the change.
    pub kind: DiffKind,
    /// What happened.
    pub outcome: MigrationOutcome,
}

impl MigrationReport {
    /// Create a report.
    pub fn new(table: impl Into<String>, kind: DiffKind, outcome: MigrationOutcome) -> Self {
        Self {
            table: table.into(),
            kind,
            outcome,
        }
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.table, self.outcome, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_applied() {
        assert!(MigrationOutcome::Applied { executed: 3, failed: 0 }.is_applied());
        assert!(!MigrationOutcome::Applied { executed: 2, failed: 1 }.is_applied());
        assert!(!MigrationOutcome::Previewed.is_applied());
    }

    #[test]
    fn test_report_display() {
        let report = MigrationReport::new(
            "user",
            DiffKind::Recreate,
            MigrationOutcome::Applied { executed: 3, failed: 0 },
        );
        assert_eq!(report.to_string(), "user: applied (3 statements) (recreate)");
    }
}
