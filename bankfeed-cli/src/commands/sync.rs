//! Sync command - pull TrueLayer transactions into the configured store

use anyhow::Result;
use colored::Colorize;

use super::{get_data_dir, get_logger, log_event};
use crate::output;
use bankfeed_core::config::Config;
use bankfeed_core::services::{
    ItemOutcome, LogEvent, SyncEvent, SyncObserver, SyncOutcome, SyncReport, SyncState,
};
use bankfeed_core::{dry_run_sync_service, BankfeedContext, Error};

/// Prints each pipeline step as it happens
struct ConsoleProgress;

impl SyncObserver for ConsoleProgress {
    fn notify(&mut self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::Started { environment } => {
                println!(
                    "{} ({})",
                    "Syncing from TrueLayer".bold(),
                    environment.as_str().to_uppercase()
                );
            }
            SyncEvent::TokenExchanged { has_refresh_token } => {
                println!("  {} Access token obtained", "✓".green());
                if has_refresh_token {
                    println!("    refresh token received");
                }
            }
            SyncEvent::AccountsFetched { count, selected } => {
                println!("  {} Found {} account(s)", "✓".green(), count);
                if let Some(account) = selected {
                    println!(
                        "    using {} ({})",
                        account.display_name.bold(),
                        account.account_type
                    );
                }
            }
            SyncEvent::TransactionsFetched { count } => {
                println!("  {} Fetched {} transaction(s)", "✓".green(), count);
            }
            SyncEvent::ItemProcessed { index, total, item } => {
                let status = match &item.outcome {
                    ItemOutcome::Synced => "✓".green().to_string(),
                    ItemOutcome::Skipped => "-".dimmed().to_string(),
                    ItemOutcome::Failed(e) => format!("{} {}", "✗".red(), e.red()),
                };
                println!(
                    "    [{}/{}] {:<32} {:>10}  {:<13} {}",
                    index + 1,
                    total,
                    truncate(&item.description, 32),
                    output::format_signed(item.amount),
                    item.category.as_str(),
                    status
                );
            }
            SyncEvent::Failed { state, .. } => {
                println!("  {} {}", "✗".red(), stage_label(state));
            }
        }
    }
}

fn stage_label(state: SyncState) -> &'static str {
    match state {
        SyncState::AuthFailed => "Authentication failed",
        SyncState::TransactionFetchFailed => "Transaction fetch failed",
        SyncState::NetworkFailed => "Network error",
        _ => "Sync failed",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn run(dry_run: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("sync"));

    let data_dir = get_data_dir()?;
    let config = Config::load(&data_dir)?;

    // Missing credentials stop the run before any network call
    let credentials = match config.credentials() {
        Ok(c) => c,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("sync_failed")
                    .with_command("sync")
                    .with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };

    let store_label = config.store.to_string();
    let service = if dry_run {
        dry_run_sync_service(&config)?
    } else {
        BankfeedContext::from_config(&data_dir, config)?.sync_service()?
    };
    let environment = credentials.environment.as_str();

    log_event(
        &logger,
        LogEvent::new("sync_started")
            .with_command("sync")
            .with_store(&store_label)
            .with_environment(environment),
    );

    let result = if json {
        service.sync(&credentials, dry_run, &mut bankfeed_core::services::NoopObserver)
    } else {
        service.sync(&credentials, dry_run, &mut ConsoleProgress)
    };

    match result {
        Ok(mut report) => {
            // Dry runs use a scratch store; report the configured one
            report.store = store_label;
            let event = match report.outcome {
                SyncOutcome::Completed => "sync_completed",
                SyncOutcome::NoAccounts | SyncOutcome::NoTransactions => "sync_empty",
            };
            log_event(
                &logger,
                LogEvent::new(event)
                    .with_command("sync")
                    .with_store(&report.store)
                    .with_environment(environment)
                    .with_counts(report.synced, report.failed),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("sync_failed")
                    .with_command("sync")
                    .with_store(&store_label)
                    .with_environment(environment)
                    .with_error(e.to_string())
                    .with_error_details(e.hints().join("\n")),
            );
            print_hints(&e);
            Err(e.into())
        }
    }
}

fn print_hints(error: &Error) {
    for hint in error.hints() {
        output::hint(hint);
    }
}

fn print_report(report: &SyncReport) {
    println!();
    match report.outcome {
        SyncOutcome::NoAccounts => {
            output::warning("No accounts found. Check that the bank connection consent is still valid.");
        }
        SyncOutcome::NoTransactions => {
            let name = report
                .account
                .as_ref()
                .map(|a| a.display_name.as_str())
                .unwrap_or("the account");
            output::warning(&format!("No transactions found for {}.", name));
        }
        SyncOutcome::Completed => {}
    }

    if report.dry_run {
        output::info(&format!(
            "Dry run: {} transaction(s) categorized, nothing written to {}",
            report.total, report.store
        ));
    } else if report.failed > 0 {
        output::warning(&report.summary_line());
        output::warning(&format!(
            "{} transaction(s) failed to save to {}",
            report.failed, report.store
        ));
    } else {
        output::success(&report.summary_line());
    }

    if let Some(token) = &report.refresh_token {
        println!();
        output::info("A refresh token was issued. Save it to skip the consent flow next time:");
        println!("  TRUELAYER_REFRESH_TOKEN={}", token);
    }
}
