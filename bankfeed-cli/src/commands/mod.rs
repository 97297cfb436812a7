//! CLI command implementations

pub mod categorize;
pub mod logs;
pub mod summary;
pub mod sync;
pub mod transactions;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use bankfeed_core::services::{LogEvent, LoggingService};
use bankfeed_core::BankfeedContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break a command)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from BANKFEED_DIR, or ~/.bankfeed
pub fn get_data_dir() -> Result<PathBuf> {
    match std::env::var("BANKFEED_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => dirs::home_dir()
            .map(|home| home.join(".bankfeed"))
            .ok_or_else(|| anyhow!("Could not find home directory; set BANKFEED_DIR")),
    }
}

/// Load configuration and open the configured store
pub fn get_context() -> Result<BankfeedContext> {
    let data_dir = get_data_dir()?;
    BankfeedContext::new(&data_dir).context("Failed to initialize bankfeed")
}
