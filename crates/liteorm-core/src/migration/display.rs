//! Operator-facing rendering of planned operations.

use super::config::CONFIRM_ENV;
use super::operator::{Choice, Operator};
use super::plan::SqlOperation;
use colored::Colorize;
use std::io;

/// Announce that nothing will be executed.
pub fn dry_run_banner<O: Operator + ?Sized>(operator: &mut O) -> io::Result<()> {
    operator.say(&format!(
        "{}",
        "🔍 Database migrations in DRY RUN mode - showing SQL without executing".yellow()
    ))?;
    operator.say(&format!(
        "{} {} {}",
        "Set".dimmed(),
        format!("{}=true", CONFIRM_ENV).red().bold(),
        "to enable actual migrations".dimmed()
    ))
}

fn params_line(operation: &SqlOperation) -> Option<String> {
    if operation.params.is_empty() {
        return None;
    }
    let values: Vec<String> = operation.params.iter().map(ToString::to_string).collect();
    Some(values.join(", "))
}

/// Show a single operation with its description, SQL, and parameters.
pub fn show_operation<O: Operator + ?Sized>(
    operator: &mut O,
    table: &str,
    operation: &SqlOperation,
    dry_run: bool,
) -> io::Result<()> {
    let marker = if operation.critical {
        "🚨 CRITICAL".red().bold().to_string()
    } else {
        "📝".to_string()
    };
    let mode = if dry_run { " [DRY RUN]" } else { "" };

    operator.say("")?;
    operator.say(&format!(
        "{}{} Database Operation for table {}:",
        marker,
        mode,
        format!("'{}'", table).cyan()
    ))?;
    operator.say(&format!("{} {}", "Description:".dimmed(), operation.description))?;
    operator.say(&format!("{} {}", "SQL:".dimmed(), operation.query.yellow()))?;
    if let Some(params) = params_line(operation) {
        operator.say(&format!("{} {}", "Parameters:".dimmed(), params.magenta()))?;
    }
    Ok(())
}

/// Show a numbered batch of operations.
pub fn show_batch<O: Operator + ?Sized>(
    operator: &mut O,
    table: &str,
    operations: &[SqlOperation],
    dry_run: bool,
) -> io::Result<()> {
    let mode = if dry_run { " [DRY RUN]" } else { "" };

    operator.say("")?;
    operator.say(&format!(
        "📋{} Batch Database Operations for table {} {}:",
        mode,
        format!("'{}'", table).cyan(),
        format!("({} operations)", operations.len()).dimmed()
    ))?;
    operator.say("")?;

    for (i, op) in operations.iter().enumerate() {
        let number = format!("{}.", i + 1);
        let line = if op.critical {
            format!(
                "{} {}{}",
                number.red(),
                "🚨 CRITICAL: ".red(),
                op.description.red()
            )
        } else {
            format!("{} {}", number.blue(), op.description)
        };
        operator.say(&line)?;
        operator.say(&format!("   {} {}", "SQL:".dimmed(), op.query.yellow()))?;
        if let Some(params) = params_line(op) {
            operator.say(&format!("   {} {}", "Parameters:".dimmed(), params.magenta()))?;
        }
    }
    Ok(())
}

/// Choices offered for a batch.
pub fn batch_choices() -> [Choice; 3] {
    [
        Choice::new("y", "Execute all operations").alias("yes"),
        Choice::new("s", "Execute operations one by one").alias("step"),
        Choice::new("n", "Skip all operations").alias("no"),
    ]
}

/// Report a successful step.
pub fn success<O: Operator + ?Sized>(operator: &mut O, message: &str) -> io::Result<()> {
    operator.say(&format!("{}", format!("✅ {}", message).green()))
}

/// Report a failed or cancelled step.
pub fn failure<O: Operator + ?Sized>(operator: &mut O, message: &str) -> io::Result<()> {
    operator.say(&format!("{}", format!("❌ {}", message).red()))
}

/// Report a warning.
pub fn warning<O: Operator + ?Sized>(operator: &mut O, message: &str) -> io::Result<()> {
    operator.say(&format!("{}", format!("⚠️  {}", message).yellow()))
}

/// Report a dimmed status note.
pub fn note<O: Operator + ?Sized>(operator: &mut O, message: &str) -> io::Result<()> {
    operator.say(&format!("{}", message.dimmed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::operator::TerminalOperator;
    use crate::value::SqlValue;
    use std::io::Cursor;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>) -> io::Result<()>,
    {
        colored::control::set_override(false);
        let mut op = TerminalOperator::new(Cursor::new(Vec::new()), Vec::new());
        f(&mut op).unwrap();
        String::from_utf8(op.into_output()).unwrap()
    }

    #[test]
    fn test_show_operation() {
        let operation =
            SqlOperation::new("Add column 'bio'", "ALTER TABLE user ADD COLUMN bio TEXT");
        let text = render(|op| show_operation(op, "user", &operation, true));

        assert!(text.contains("📝 [DRY RUN] Database Operation for table 'user':"));
        assert!(text.contains("Description: Add column 'bio'"));
        assert!(text.contains("SQL: ALTER TABLE user ADD COLUMN bio TEXT"));
        assert!(!text.contains("Parameters:"));
    }

    #[test]
    fn test_show_batch_marks_critical() {
        let ops = vec![
            SqlOperation::new("Copy", "INSERT INTO t (a) SELECT ? FROM u")
                .with_params(vec![SqlValue::from("x")]),
            SqlOperation::critical("Drop old table 'u'", "DROP TABLE u"),
        ];
        let text = render(|op| show_batch(op, "u", &ops, false));

        assert!(text.contains("📋 Batch Database Operations for table 'u' (2 operations):"));
        assert!(text.contains("1. Copy"));
        assert!(text.contains("   Parameters: 'x'"));
        assert!(text.contains("2. 🚨 CRITICAL: Drop old table 'u'"));
    }

    #[test]
    fn test_banner_names_variable() {
        let text = render(|op| dry_run_banner(op));
        assert!(text.contains("DRY RUN mode"));
        assert!(text.contains("LITEORM_CONFIRM_MIGRATIONS=true"));
    }
}
