//! Summary service - monthly income and spending over stored transactions

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::StoredTransaction;
use crate::ports::TransactionStore;

/// Label for spend whose category is blank
pub const OTHER_CATEGORY: &str = "Other";

pub struct SummaryService {
    store: Arc<dyn TransactionStore>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Summarize one month (YYYY-MM), or the latest month with data
    pub fn monthly(&self, month: Option<&str>) -> Result<MonthlySummary> {
        if let Some(m) = month {
            validate_month(m)?;
        }

        let transactions = self.store.list_transactions()?;
        Ok(summarize(&transactions, month))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    /// Selected month, None when the store is empty and none was requested
    pub month: Option<String>,
    /// Months with data, newest first
    pub months: Vec<String>,
    pub transaction_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net: Decimal,
    /// Percentage of income kept, 0 when there was no income
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_rate: Decimal,
    pub categories: Vec<CategorySpend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

fn validate_month(month: &str) -> Result<()> {
    let valid = month.len() == 7
        && chrono::NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Invalid month '{}', expected YYYY-MM",
            month
        )))
    }
}

fn month_of(tx: &StoredTransaction) -> &str {
    tx.date.get(..7).unwrap_or(&tx.date)
}

fn summarize(transactions: &[StoredTransaction], month: Option<&str>) -> MonthlySummary {
    let months: Vec<String> = transactions
        .iter()
        .map(|tx| month_of(tx).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect();

    let selected = month
        .map(|m| m.to_string())
        .or_else(|| months.first().cloned());

    let in_month: Vec<&StoredTransaction> = match &selected {
        Some(m) => transactions.iter().filter(|tx| month_of(tx) == m).collect(),
        None => Vec::new(),
    };

    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut by_category: HashMap<String, Decimal> = HashMap::new();

    for tx in &in_month {
        if tx.is_income {
            income += tx.amount;
        } else {
            expenses += tx.amount;
            let label = if tx.category.trim().is_empty() {
                OTHER_CATEGORY.to_string()
            } else {
                tx.category.clone()
            };
            *by_category.entry(label).or_insert(Decimal::ZERO) += tx.amount;
        }
    }

    let net = income - expenses;
    let savings_rate = if income > Decimal::ZERO {
        (net / income * Decimal::ONE_HUNDRED).round_dp(1)
    } else {
        Decimal::ZERO
    };

    let mut categories: Vec<CategorySpend> = by_category
        .into_iter()
        .map(|(category, amount)| CategorySpend { category, amount })
        .collect();
    categories.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));

    MonthlySummary {
        month: selected,
        months,
        transaction_count: in_month.len(),
        income,
        expenses,
        net,
        savings_rate,
        categories,
    }
}
