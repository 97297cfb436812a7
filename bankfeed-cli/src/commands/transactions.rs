//! Transactions command - list what the store holds

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;
use bankfeed_core::StoredTransaction;

/// Case-insensitive match on description, merchant or category
fn matches(tx: &StoredTransaction, needle: &str) -> bool {
    [&tx.description, &tx.merchant_name, &tx.category]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn filter(
    transactions: Vec<StoredTransaction>,
    search: Option<&str>,
    limit: usize,
) -> Vec<StoredTransaction> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    transactions
        .into_iter()
        .filter(|tx| needle.as_deref().map_or(true, |n| matches(tx, n)))
        .take(limit)
        .collect()
}

pub fn run(search: Option<&str>, limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rows = filter(ctx.store.list_transactions()?, search, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Description", "Category", "Amount", "ID"]);
    for tx in &rows {
        let amount = output::format_stored(tx.amount, tx.is_income);
        let amount = if tx.is_income {
            amount.green().to_string()
        } else {
            amount
        };
        table.add_row(vec![
            tx.date.clone(),
            tx.description.clone(),
            tx.category.clone(),
            format!("{} {}", amount, tx.currency),
            tx.truelayer_id.clone(),
        ]);
    }
    println!("{}", table);
    println!("{} transaction(s) from {}", rows.len(), ctx.store.name());
    Ok(())
}
