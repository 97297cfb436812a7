//! Bankfeed CLI - bank transactions from TrueLayer into your store

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{categorize, logs, summary, sync, transactions};

/// Bankfeed - sync categorized bank transactions from TrueLayer
#[derive(Parser)]
#[command(name = "bankfeed", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange the authorization code and sync the first account's transactions
    Sync {
        /// Fetch and categorize without writing to the store
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the category of a stored transaction
    Categorize {
        /// TrueLayer transaction id
        id: String,
        /// New category label (e.g. Groceries)
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Monthly income, spending and savings rate
    Summary {
        /// Month as YYYY-MM (defaults to the latest month with data)
        #[arg(short, long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored transactions, newest first
    Transactions {
        /// Filter on description, merchant or category
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum rows to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    // A .env file in the working directory is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync { dry_run, json } => sync::run(dry_run, json),
        Commands::Categorize { id, category, json } => categorize::run(&id, &category, json),
        Commands::Summary { month, json } => summary::run(month.as_deref(), json),
        Commands::Transactions {
            search,
            limit,
            json,
        } => transactions::run(search.as_deref(), limit, json),
        Commands::Logs { command } => logs::run(command),
    }
}
