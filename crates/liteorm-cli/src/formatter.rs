//! Output formatters for plans and live tables.

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Cell, Table};
use liteorm_core::migration::{LiveTable, TablePlan};
use serde_json::json;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Format table plans.
pub fn format_plans(plans: &[TablePlan], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => plans
            .iter()
            .map(plan_as_table)
            .collect::<Vec<_>>()
            .join("\n\n"),
        OutputFormat::Json => {
            let value: Vec<serde_json::Value> = plans.iter().map(plan_to_json).collect();
            serde_json::Value::Array(value).to_string()
        }
    }
}

/// Format a live table snapshot.
pub fn format_live_table(live: &LiveTable, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => live_as_table(live),
        OutputFormat::Json => live_to_json(live).to_string(),
    }
}

fn plan_as_table(plan: &TablePlan) -> String {
    let heading = format!("{} ({})", plan.table().bold(), plan.kind());
    if plan.operations.is_empty() {
        return format!("{}\nNothing to do", heading);
    }

    let mut lines = vec![heading];
    for reason in plan.diff.recreation_reasons() {
        lines.push(format!("  - {}", reason.describe()));
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Description", "SQL", "Critical"]);
    for (i, op) in plan.operations.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&op.description),
            Cell::new(&op.query),
            Cell::new(if op.critical { "yes" } else { "" }),
        ]);
    }
    lines.push(table.to_string());

    lines.join("\n")
}

fn plan_to_json(plan: &TablePlan) -> serde_json::Value {
    let reasons: Vec<String> = plan
        .diff
        .recreation_reasons()
        .map(|reason| reason.describe())
        .collect();
    let operations: Vec<serde_json::Value> = plan
        .operations
        .iter()
        .map(|op| {
            let params: Vec<String> = op.params.iter().map(ToString::to_string).collect();
            json!({
                "description": op.description,
                "query": op.query,
                "params": params,
                "critical": op.critical,
            })
        })
        .collect();

    json!({
        "table": plan.table(),
        "kind": plan.kind().to_string(),
        "reasons": reasons,
        "operations": operations,
    })
}

fn live_as_table(live: &LiveTable) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Type", "Not null", "Unique"]);

    for column in &live.columns {
        let unique = if column.is_primary_key() {
            "primary key"
        } else if has_own_unique_index(live, &column.name) {
            "yes"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(&column.sql_type),
            Cell::new(if column.not_null { "yes" } else { "" }),
            Cell::new(unique),
        ]);
    }

    let mut output = format!("{}\n{}", live.name.bold(), table);
    for group in live.unique_groups.iter().filter(|g| g.len() > 1) {
        output.push_str(&format!("\nUNIQUE({})", group.join(", ")));
    }
    if !live.has_rows {
        output.push_str("\n(empty)");
    }
    output
}

// Composite indexes are listed separately.
fn has_own_unique_index(live: &LiveTable, column: &str) -> bool {
    live.has_unique_group(&[column.to_string()])
}

fn live_to_json(live: &LiveTable) -> serde_json::Value {
    let columns: Vec<serde_json::Value> = live
        .columns
        .iter()
        .map(|column| {
            json!({
                "name": column.name,
                "type": column.sql_type,
                "not_null": column.not_null,
                "primary_key": column.is_primary_key(),
                "unique": has_own_unique_index(live, &column.name),
            })
        })
        .collect();

    json!({
        "table": live.name,
        "columns": columns,
        "unique_groups": live.unique_groups,
        "has_rows": live.has_rows,
    })
}
