//! liteorm Command-Line Client
//!
//! Migrates, plans and inspects SQLite tables against a JSON schema declaration.

mod commands;
mod formatter;

use anyhow::Context;
use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use std::path::PathBuf;

/// liteorm Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "liteorm")]
#[command(version, about = "liteorm schema migration tool")]
pub struct Args {
    /// SQLite database file
    #[arg(short = 'd', long, default_value = "liteorm.db")]
    pub database: PathBuf,

    /// JSON schema declaration
    #[arg(short = 's', long, default_value = "schema.json")]
    pub schema: PathBuf,

    /// Execute migrations instead of previewing them.
    /// Without it, LITEORM_CONFIRM_MIGRATIONS decides.
    #[arg(long)]
    pub confirm: bool,

    /// Run table recreations without a wrapping transaction
    #[arg(long)]
    pub no_atomic: bool,

    /// Output format for plan and inspect
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring live tables in line with the declaration
    Migrate {
        /// Migrate only this table
        #[arg(short, long)]
        table: Option<String>,
    },
    /// Show what a migration would do, without prompting
    Plan {
        /// Plan only this table
        #[arg(short, long)]
        table: Option<String>,
    },
    /// Show the live columns and unique indexes of a table
    Inspect {
        /// Table name
        table: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so prompts on stdout stay readable.
fn init_tracing() -> anyhow::Result<()> {
    let directive: tracing_subscriber::filter::Directive = "liteorm=info"
        .parse()
        .context("invalid default log directive")?;
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(directive);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    match &args.command {
        Command::Migrate { table } => {
            let catalog = commands::load_catalog(&args.schema)?;
            let config = commands::migration_config(args.confirm, args.no_atomic);
            commands::migrate(&args.database, &catalog, table.as_deref(), config)
        }
        Command::Plan { table } => {
            let catalog = commands::load_catalog(&args.schema)?;
            commands::plan(
                &args.database,
                &catalog,
                table.as_deref(),
                args.format,
                &mut stdout,
            )
        }
        Command::Inspect { table } => {
            commands::inspect(&args.database, table, args.format, &mut stdout)
        }
    }
}
