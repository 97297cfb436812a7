//! Categorize command - correct the category of a stored transaction

use anyhow::Result;

use super::{get_context, get_logger, log_event};
use crate::output;
use bankfeed_core::services::LogEvent;
use bankfeed_core::{Category, Error};

pub fn run(truelayer_id: &str, category: &str, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("categorize"));

    let ctx = get_context()?;
    let category = match ctx.category_service.set_category(truelayer_id, category) {
        Ok(c) => c,
        Err(e) => {
            if !json {
                if let Error::Validation(_) = e {
                    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                    output::hint(&format!("Valid categories: {}", labels.join(", ")));
                }
            }
            return Err(e.into());
        }
    };

    log_event(
        &logger,
        LogEvent::new("category_updated")
            .with_command("categorize")
            .with_store(ctx.store.name()),
    );

    if json {
        println!(
            "{}",
            serde_json::json!({ "truelayer_id": truelayer_id, "category": category })
        );
    } else {
        output::success(&format!("{} → {}", truelayer_id, category));
    }
    Ok(())
}
