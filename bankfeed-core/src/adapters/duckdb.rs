//! DuckDB transaction store
//!
//! Local alternative to the hosted store. Same table shape and the same
//! conflict key, so re-running a sync leaves one row per `truelayer_id`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::StoredTransaction;
use crate::ports::TransactionStore;
use crate::services::{MigrationResult, MigrationService};

const SELECT_COLUMNS: &str = "SELECT truelayer_id, CAST(amount AS VARCHAR), description, merchant_name,
        category, \"date\", is_income, currency
 FROM transactions";

/// DuckDB-backed `TransactionStore`
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) the database file and bring its schema up to date
    pub fn open(db_path: &Path) -> Result<Self> {
        // Cached extensions are not needed; JSON is linked in via the "json" feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Self::from_connection(conn, Some(db_path.to_path_buf()))
    }

    /// In-memory store, used for dry runs and tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Run pending migrations and report what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Number of stored transactions
    pub fn count(&self) -> DomainResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Look up one stored transaction
    pub fn get_transaction(&self, truelayer_id: &str) -> DomainResult<Option<StoredTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} WHERE truelayer_id = ?", SELECT_COLUMNS))?;
        let mut rows = stmt.query_map([truelayer_id], read_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row??)),
            None => Ok(None),
        }
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DomainError::database(format!("Lock poisoned: {}", e)))
    }
}

/// Map one SELECT_COLUMNS row; the amount comes back as text to keep it exact
fn read_row(row: &duckdb::Row) -> duckdb::Result<DomainResult<StoredTransaction>> {
    let amount_text: String = row.get(1)?;
    let amount = match Decimal::from_str(amount_text.trim()) {
        Ok(amount) => amount.normalize(),
        Err(e) => {
            return Ok(Err(DomainError::database(format!(
                "Invalid stored amount '{}': {}",
                amount_text, e
            ))))
        }
    };

    Ok(Ok(StoredTransaction {
        truelayer_id: row.get(0)?,
        amount,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        merchant_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        category: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        date: row.get(5)?,
        is_income: row.get(6)?,
        currency: row.get(7)?,
    }))
}

impl TransactionStore for DuckDbStore {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn upsert_transaction(&self, tx: &StoredTransaction) -> DomainResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO transactions (truelayer_id, amount, description, merchant_name,
                                       category, \"date\", is_income, currency)
             VALUES (?, CAST(? AS DECIMAL(18, 4)), ?, ?, ?, ?, ?, ?)
             ON CONFLICT (truelayer_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                description = EXCLUDED.description,
                merchant_name = EXCLUDED.merchant_name,
                category = EXCLUDED.category,
                \"date\" = EXCLUDED.\"date\",
                is_income = EXCLUDED.is_income,
                currency = EXCLUDED.currency,
                updated_at = CURRENT_TIMESTAMP",
            params![
                tx.truelayer_id,
                tx.amount.to_string(),
                tx.description,
                tx.merchant_name,
                tx.category,
                tx.date,
                tx.is_income,
                tx.currency,
            ],
        )
        .map_err(|e| DomainError::persistence(format!("DuckDB upsert failed: {}", e)))?;
        Ok(())
    }

    fn list_transactions(&self) -> DomainResult<Vec<StoredTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY \"date\" DESC, truelayer_id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], read_row)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row??);
        }
        Ok(transactions)
    }

    fn update_category(&self, truelayer_id: &str, category: &str) -> DomainResult<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE transactions SET category = ?, updated_at = CURRENT_TIMESTAMP
             WHERE truelayer_id = ?",
            params![category, truelayer_id],
        )?;
        Ok(updated > 0)
    }
}
