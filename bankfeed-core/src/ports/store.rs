//! Transaction store port

use crate::domain::result::Result;
use crate::domain::StoredTransaction;

/// Name of the table every store writes to
pub const TRANSACTIONS_TABLE: &str = "transactions";

/// Conflict key for upserts
pub const CONFLICT_KEY: &str = "truelayer_id";

/// Persistent sync target for categorized transactions
pub trait TransactionStore: Send + Sync {
    /// Store name (e.g., "supabase", "duckdb")
    fn name(&self) -> &str;

    /// Insert the record or replace the one with the same `truelayer_id`
    fn upsert_transaction(&self, tx: &StoredTransaction) -> Result<()>;

    /// All stored transactions, newest date first
    fn list_transactions(&self) -> Result<Vec<StoredTransaction>>;

    /// Overwrite the category of one stored transaction
    ///
    /// Returns false when no record has that `truelayer_id`.
    fn update_category(&self, truelayer_id: &str, category: &str) -> Result<bool>;
}
