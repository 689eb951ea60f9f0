//! Command-line front end for the expense store.
//!
//! # Responsibility
//! - Map subcommands onto `ExpenseService` and the bulk helpers.
//! - Keep stdout to records and short status lines; diagnostics go to the log.

use clap::{Parser, Subcommand};
use expense_core::{
    clear_all, default_log_level, init_logging, seed_all, Expense, ExpenseService, ExpenseStore,
    NewExpense, StoreConfig,
};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "expense", version, about = "Local expense tracker")]
struct Cli {
    /// Database file; defaults to `expenses.db` in the working directory.
    #[arg(long, value_name = "PATH", global = true, conflicts_with = "memory")]
    db: Option<PathBuf>,
    /// Use a throwaway in-memory store.
    #[arg(long, global = true)]
    memory: bool,
    /// Milliseconds to wait on locks held by other connections.
    #[arg(long, value_name = "MS", global = true)]
    busy_timeout_ms: Option<u64>,
    /// Directory for rotating log files; logging stays off when omitted.
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records with low <= amount <= high.
    Search {
        #[arg(allow_hyphen_values = true)]
        low: String,
        #[arg(allow_hyphen_values = true)]
        high: String,
    },
    /// Create a record and print its id.
    Add {
        title: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    Show { id: i64 },
    /// Replace title and amount of an existing record.
    Edit {
        id: i64,
        title: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    Delete { id: i64 },
    /// Insert records from a JSON array of `{"title", "amount"}` objects.
    Seed { file: PathBuf },
    /// Delete every record.
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = start_logging(level, dir) {
            eprintln!("warning: {err}");
        }
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_command module=cli status=error error={}", message);
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = store_config(&cli);
    let store = ExpenseStore::open(&config)
        .await
        .map_err(|err| format!("cannot open store: {err}"))?;
    let service = ExpenseService::new(store);

    match cli.command {
        Command::Search { low, high } => {
            let rows = service
                .search_text(&low, &high)
                .await
                .map_err(|err| err.to_string())?;
            if rows.is_empty() {
                println!("no results found");
            }
            for row in &rows {
                print_row(row);
            }
        }
        Command::Add { title, amount } => {
            let id = service
                .create_record(&title, &amount)
                .await
                .map_err(|err| err.to_string())?;
            println!("{id}");
        }
        Command::Show { id } => {
            let row = service
                .load_record_for_edit(id)
                .await
                .map_err(|err| err.to_string())?;
            print_row(&row);
        }
        Command::Edit { id, title, amount } => {
            service
                .update_record(id, &title, &amount)
                .await
                .map_err(|err| err.to_string())?;
            println!("updated {id}");
        }
        Command::Delete { id } => {
            service
                .delete_record(id)
                .await
                .map_err(|err| err.to_string())?;
            println!("deleted {id}");
        }
        Command::Seed { file } => {
            let drafts = read_drafts(&file)?;
            let report = seed_all(service.store(), drafts).await;
            for failure in &report.failures {
                eprintln!("item {}: {}", failure.index, failure.error);
            }
            println!(
                "inserted {} failed {}",
                report.inserted.len(),
                report.failures.len()
            );
        }
        Command::Clear => {
            let report = clear_all(service.store())
                .await
                .map_err(|err| err.to_string())?;
            for (id, err) in &report.failures {
                eprintln!("record {id}: {err}");
            }
            println!("deleted {} of {}", report.deleted, report.visited);
        }
    }
    Ok(())
}

fn store_config(cli: &Cli) -> StoreConfig {
    let mut config = match cli.db.as_ref() {
        Some(path) => StoreConfig::file(path),
        None if cli.memory => StoreConfig::in_memory(),
        None => StoreConfig::in_dir("."),
    };
    if let Some(ms) = cli.busy_timeout_ms {
        config = config.with_busy_timeout(Duration::from_millis(ms));
    }
    config
}

fn start_logging(level: &str, dir: &Path) -> Result<(), String> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| format!("cannot resolve log directory: {err}"))?
            .join(dir)
    };
    init_logging(level, &dir).map_err(|err| err.to_string())
}

fn read_drafts(file: &Path) -> Result<Vec<NewExpense>, String> {
    let raw = std::fs::read_to_string(file)
        .map_err(|err| format!("cannot read `{}`: {err}", file.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid seed file `{}`: {err}", file.display()))
}

fn print_row(row: &Expense) {
    println!("{}\t{}\t{}", row.id, row.title, row.amount);
}
