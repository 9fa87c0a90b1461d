//! Operator dialogs that settle how data survives a table rebuild.

use super::display;
use super::error::MigrationError;
use super::operator::{Choice, Operator};
use crate::catalog::{FieldDef, SqlType};
use crate::value::SqlValue;
use colored::Colorize;
use std::io;

/// Ask for a backfill value for each new NOT NULL column.
///
/// An empty answer is fatal: existing rows could not be copied without
/// violating the constraint.
pub fn resolve_defaults<O: Operator + ?Sized>(
    operator: &mut O,
    table: &str,
    fields: &[FieldDef],
) -> Result<Vec<(String, SqlValue)>, MigrationError> {
    let mut defaults = Vec::with_capacity(fields.len());

    for field in fields {
        operator.say("")?;
        display::warning(
            operator,
            &format!(
                "Column '{}' is NOT NULL but table has existing data",
                field.name.cyan()
            ),
        )?;
        operator.say(&format!("{} {}", "Type:".dimmed(), field.sql_type))?;

        let prompt = format!("{}", "Enter default value for existing rows:".green());
        match operator.ask(&prompt)?.filter(|a| !a.is_empty()) {
            Some(text) => {
                defaults.push((field.name.clone(), parse_default(&field.sql_type, &text)));
            }
            None => {
                display::failure(operator, "Default value required for NOT NULL column")?;
                return Err(MigrationError::MissingDefault {
                    table: table.to_string(),
                    column: field.name.clone(),
                });
            }
        }
    }

    Ok(defaults)
}

/// Convert an operator-typed value using the column's declared type.
///
/// Values that do not parse stay text and are left to SQLite's type affinity.
pub fn parse_default(sql_type: &SqlType, text: &str) -> SqlValue {
    match sql_type {
        SqlType::Integer => text
            .parse::<i64>()
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::from(text)),
        SqlType::Real | SqlType::Numeric => text
            .parse::<f64>()
            .map(SqlValue::Real)
            .unwrap_or_else(|_| SqlValue::from(text)),
        SqlType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => SqlValue::Integer(1),
            "false" | "no" | "0" => SqlValue::Integer(0),
            _ => SqlValue::from(text),
        },
        _ => SqlValue::from(text),
    }
}

/// Ask which old column feeds each new column.
///
/// Returns `(new, old)` pairs, or `None` if the operator cancels the rebuild.
/// An unknown answer skips the column.
pub fn resolve_mapping<O: Operator + ?Sized>(
    operator: &mut O,
    table: &str,
    old_columns: &[String],
    new_columns: &[String],
) -> io::Result<Option<Vec<(String, String)>>> {
    operator.say("")?;
    operator.say(&format!(
        "{} Column mapping required for table {}",
        "🔄".yellow(),
        format!("'{}'", table).cyan()
    ))?;
    operator.say(&format!("{} {}", "Old columns:".dimmed(), old_columns.join(", ").blue()))?;
    operator.say(&format!("{} {}", "New columns:".dimmed(), new_columns.join(", ").green()))?;
    operator.say("")?;

    let mut choices: Vec<Choice> = old_columns
        .iter()
        .enumerate()
        .map(|(i, old)| Choice::new((i + 1).to_string(), old.clone()))
        .collect();
    choices.push(Choice::new("s", "Skip (no mapping, data will be lost)").alias("skip"));
    let skip = choices.len() - 1;

    let mut mapping = Vec::new();
    for new_column in new_columns {
        operator.say(&format!(
            "{}",
            format!("Map old column to new column '{}':", new_column).bold()
        ))?;

        match operator.choose("Enter number or s", &choices)? {
            Some(i) if i == skip => {
                display::warning(
                    operator,
                    &format!("No mapping for '{}' - data will be lost", new_column),
                )?;
            }
            Some(i) => {
                let old = &old_columns[i];
                operator.say(&format!(
                    "{}",
                    format!("✓ Mapped '{}' → '{}'", old, new_column).green()
                ))?;
                mapping.push((new_column.clone(), old.clone()));
            }
            None => {
                operator.say(&format!(
                    "{}",
                    format!("Invalid selection for '{}' - skipping", new_column).red()
                ))?;
            }
        }
    }

    if mapping.is_empty() {
        display::warning(operator, "No column mappings created")?;
        let prompt = format!("{}", "Proceed without copying any data?".red());
        let proceed = operator.confirm(&prompt, false)?;
        return Ok(proceed.then_some(mapping));
    }

    operator.say(&format!("{}", "📋 Column mapping summary:".green()))?;
    for (new, old) in &mapping {
        operator.say(&format!("  {} → {}", old.blue(), new.green()))?;
    }
    operator.say("")?;

    let confirmed = operator.confirm(&format!("{}", "Confirm mapping?".green()), true)?;
    Ok(confirmed.then_some(mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::operator::TerminalOperator;
    use std::io::Cursor;

    type ScriptedOperator = TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>;

    fn operator(input: &str) -> ScriptedOperator {
        colored::control::set_override(false);
        TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_are_typed() {
        let fields = vec![
            FieldDef::required("age", SqlType::Integer),
            FieldDef::required("nick", SqlType::Text),
        ];
        let mut op = operator("30\nace\n");

        let defaults = resolve_defaults(&mut op, "user", &fields).unwrap();
        assert_eq!(
            defaults,
            vec![
                ("age".to_string(), SqlValue::Integer(30)),
                ("nick".to_string(), SqlValue::from("ace")),
            ]
        );
    }

    #[test]
    fn test_empty_default_is_fatal() {
        let fields = vec![FieldDef::required("age", SqlType::Integer)];
        let mut op = operator("\n");

        let err = resolve_defaults(&mut op, "user", &fields).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::MissingDefault { ref table, ref column }
                if table == "user" && column == "age"
        ));
        let text = String::from_utf8(op.into_output()).unwrap();
        assert!(text.contains("Default value required for NOT NULL column"));
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(parse_default(&SqlType::Integer, "x"), SqlValue::from("x"));
        assert_eq!(parse_default(&SqlType::Real, "2.5"), SqlValue::Real(2.5));
        assert_eq!(parse_default(&SqlType::Boolean, "TRUE"), SqlValue::Integer(1));
        assert_eq!(parse_default(&SqlType::Text, "12"), SqlValue::from("12"));
    }

    #[test]
    fn test_mapping_confirmed() {
        let old = strings(&["name", "email"]);
        let new = strings(&["full_name", "mail", "bio"]);
        let mut op = operator("1\n2\ns\n\n");

        let mapping = resolve_mapping(&mut op, "user", &old, &new).unwrap();
        assert_eq!(
            mapping,
            Some(vec![
                ("full_name".to_string(), "name".to_string()),
                ("mail".to_string(), "email".to_string()),
            ])
        );

        let text = String::from_utf8(op.into_output()).unwrap();
        assert!(text.contains("No mapping for 'bio' - data will be lost"));
        assert!(text.contains("name → full_name"));
    }

    #[test]
    fn test_mapping_invalid_selection_skips() {
        let old = strings(&["name"]);
        let new = strings(&["full_name"]);
        let mut op = operator("7\ny\n");

        let mapping = resolve_mapping(&mut op, "user", &old, &new).unwrap();
        assert_eq!(mapping, Some(Vec::new()));
        let text = String::from_utf8(op.into_output()).unwrap();
        assert!(text.contains("Invalid selection for 'full_name' - skipping"));
    }

    #[test]
    fn test_mapping_declined() {
        let old = strings(&["name"]);
        let new = strings(&["full_name"]);

        let mut op = operator("s\n\n");
        assert_eq!(resolve_mapping(&mut op, "user", &old, &new).unwrap(), None);

        let mut op = operator("1\nn\n");
        assert_eq!(resolve_mapping(&mut op, "user", &old, &new).unwrap(), None);
    }
}
