//! Transaction domain models
//!
//! `Transaction` is the Data API representation; `StoredTransaction` is the
//! row written to the `transactions` table, keyed by `truelayer_id`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::category::Category;
use super::result::Error;

/// A transaction as returned by the Data API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    /// Signed: positive is money in
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// ISO-8601, e.g. 2024-03-01T00:00:00+00:00
    pub timestamp: String,
}

fn default_currency() -> String {
    "GBP".to_string()
}

/// Deserialize amount that can be number or string
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        JsonValue::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

impl Transaction {
    /// Money in. Zero counts as an expense.
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Calendar date part of the timestamp (first 10 characters)
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

/// One undecoded entry of a transactions page
///
/// Pages are decoded entry by entry so a malformed record fails alone
/// instead of failing the whole fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction(pub JsonValue);

impl RawTransaction {
    /// `transaction_id`, when the record carries one
    pub fn id(&self) -> Option<&str> {
        self.0.get("transaction_id").and_then(JsonValue::as_str)
    }

    pub fn description(&self) -> &str {
        self.0
            .get("description")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
    }

    pub fn parse(&self) -> super::result::Result<Transaction> {
        serde_json::from_value(self.0.clone()).map_err(|e| {
            Error::validation(format!(
                "Malformed transaction {}: {}",
                self.id().unwrap_or("without id"),
                e
            ))
        })
    }
}

impl From<&Transaction> for RawTransaction {
    fn from(tx: &Transaction) -> Self {
        RawTransaction(serde_json::to_value(tx).unwrap_or_default())
    }
}

/// The persisted form of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub truelayer_id: String,
    /// Always non-negative; direction lives in `is_income`
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub merchant_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    pub date: String,
    #[serde(default)]
    pub is_income: bool,
    #[serde(default = "default_currency", deserialize_with = "null_as_default")]
    pub currency: String,
}

/// Rows edited outside the sync may hold NULL in text columns
fn null_as_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl StoredTransaction {
    /// Build the stored row for a fetched transaction
    ///
    /// Income always carries the `Income` label whatever was passed in.
    pub fn from_transaction(tx: &Transaction, category: Category) -> Self {
        let is_income = tx.is_income();
        let category = if is_income { Category::Income } else { category };

        Self {
            truelayer_id: tx.transaction_id.clone(),
            amount: tx.amount.abs(),
            description: tx.description.clone(),
            merchant_name: tx.merchant_name.clone().unwrap_or_default(),
            category: category.to_string(),
            date: tx.date().to_string(),
            is_income,
            currency: tx.currency.clone(),
        }
    }
}
