//! Summary command - income, spending and savings for one month

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;

pub fn run(month: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.summary_service.monthly(month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let Some(selected) = &summary.month else {
        println!("No transactions stored yet. Run 'bankfeed sync' first.");
        return Ok(());
    };

    println!("{} {}", "Summary for".bold(), selected.bold());
    println!("  Transactions: {}", summary.transaction_count);
    println!("  Income:       {}", format!("{:.2}", summary.income).green());
    println!("  Expenses:     {}", format!("{:.2}", summary.expenses).red());
    let net = output::format_signed(summary.net);
    if summary.net < Decimal::ZERO {
        println!("  Net:          {}", net.red());
    } else {
        println!("  Net:          {}", net.green());
    }
    println!("  Savings rate: {}%", summary.savings_rate);

    if !summary.categories.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Spent", "Share"]);
        for spend in &summary.categories {
            let share = if summary.expenses > Decimal::ZERO {
                (spend.amount / summary.expenses * Decimal::ONE_HUNDRED).round_dp(1)
            } else {
                Decimal::ZERO
            };
            table.add_row(vec![
                spend.category.clone(),
                format!("{:.2}", spend.amount),
                format!("{}%", share),
            ]);
        }
        println!("{}", table);
    }

    if summary.months.len() > 1 {
        println!();
        println!("{} {}", "Other months:".dimmed(), summary.months.join(", ").dimmed());
    }
    Ok(())
}
