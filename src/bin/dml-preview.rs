//! dml-preview: preview data-changing SQL as SELECTs
//!
//! # Usage
//!
//! ```bash
//! # Convert a statement
//! dml-preview "delete from sales.orders o where o.id = 1;" --id abc
//!
//! # Read a batch from a file, show a table
//! dml-preview --file changes.sql --id abc --format table
//!
//! # Only check the batch preconditions
//! dml-preview check --file changes.sql --id abc
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dml_preview::prelude::*;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dml-preview")]
#[command(version)]
#[command(about = "Preview UPDATE, DELETE and MERGE statements as SELECTs", long_about = None)]
#[command(after_help = "EXAMPLES:
    dml-preview 'delete from s.orders o where o.id = 1;' --id abc
    dml-preview --file batch.sql --id abc --format table
    cat batch.sql | dml-preview --id abc --format pretty")]
struct Cli {
    /// SQL batch; read from --file or stdin when omitted
    sql: Option<String>,

    /// Read the SQL batch from a file
    #[arg(short = 'F', long, global = true)]
    file: Option<PathBuf>,

    /// Identifier injected into entity-id expressions
    #[arg(short, long, env = "DML_PREVIEW_ID", global = true)]
    id: Option<String>,

    /// Configuration file (default: ./dml-preview.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the batch preconditions without converting
    Check {
        /// SQL batch; read from --file or stdin when omitted
        sql: Option<String>,
    },
    /// Show the accepted predicate forms
    Grammar,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Check { sql }) => run_check(&cli, sql.as_deref()),
        Some(Commands::Grammar) => {
            show_grammar();
            Ok(true)
        }
        None => run_convert(&cli),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dml_preview=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ConverterConfig> {
    match &cli.config {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => ConverterConfig::discover().context("Failed to load configuration"),
    }
}

fn read_sql(cli: &Cli, positional: Option<&str>) -> Result<String> {
    if let Some(sql) = positional {
        return Ok(sql.to_string());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut sql = String::new();
    io::stdin()
        .read_to_string(&mut sql)
        .context("Failed to read SQL from stdin")?;
    Ok(sql)
}

/// Returns `Ok(false)` when any record is an error.
fn run_convert(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    let patterns = Patterns::compile(&config)?;
    let catalog = config.catalog()?;

    let sql = read_sql(cli, cli.sql.as_deref())?;
    let id = cli.id.clone().unwrap_or_default();
    let converter = Converter::new(&patterns, &catalog, sql, &id);

    if let Some(message) = converter.validation_error_message() {
        eprintln!("{} {}", "✗".red().bold(), message);
        return Ok(false);
    }

    let records = converter.convert()?;
    match cli.format {
        OutputFormat::Json => {
            let bytes = to_wire_format(&records)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        OutputFormat::Pretty => {
            println!("{}", dml_preview::output::to_pretty_json(&records)?);
        }
        OutputFormat::Table => print_table(&records),
    }

    Ok(records.iter().all(|record| !record.is_error))
}

fn run_check(cli: &Cli, positional: Option<&str>) -> Result<bool> {
    let config = load_config(cli)?;
    let patterns = Patterns::compile(&config)?;
    let catalog = config.catalog()?;

    let sql = read_sql(cli, positional.or(cli.sql.as_deref()))?;
    let id = cli.id.clone().unwrap_or_default();
    let converter = Converter::new(&patterns, &catalog, sql, &id);

    match converter.validation_error_message() {
        Some(message) => {
            println!("{} {}", "✗".red().bold(), message);
            Ok(false)
        }
        None => {
            let kinds = converter.statement_kinds();
            println!(
                "{} {} statement(s) ready to convert",
                "✓".green().bold(),
                kinds.len().to_string().cyan()
            );
            for (i, kind) in kinds.iter().enumerate() {
                let label = match kind {
                    StatementKind::Unknown => kind.to_string().yellow(),
                    _ => kind.to_string().white(),
                };
                println!("  {:>3}. {}", i + 1, label);
            }
            Ok(true)
        }
    }
}

fn print_table(records: &[ConversionRecord]) {
    if records.is_empty() {
        println!("{}", "(no statements)".dimmed());
        return;
    }

    for (i, record) in records.iter().enumerate() {
        let status = if record.is_error {
            "✗".red().bold()
        } else {
            "✓".green().bold()
        };
        println!(
            "{} {} {}",
            status,
            format!("#{}", i + 1).cyan(),
            record.message.white()
        );
        println!("{}", "─".repeat(60).dimmed());
        for line in record.sql.lines() {
            println!("  {}", line);
        }
        println!();
    }

    let failed = records.iter().filter(|record| record.is_error).count();
    println!(
        "{} converted, {} failed",
        (records.len() - failed).to_string().green(),
        failed.to_string().red()
    );
}

fn show_grammar() {
    println!("{}", "Accepted predicate forms".cyan().bold());
    println!();
    println!("{:4} {:26} {}", "#".white().bold(), "Form".white().bold(), "Shape".white().bold());
    println!("{}", "─".repeat(80).dimmed());

    for (i, form) in PredicateForm::ALL.into_iter().enumerate() {
        println!(
            "{:4} {:26} {}",
            (i + 1).to_string().dimmed(),
            format!("{:?}", form).yellow(),
            form.description().white()
        );
    }
    println!();
    println!(
        "{}",
        "Predicates are split on WHERE, AND and OR; each piece must match one form.".dimmed()
    );
}
