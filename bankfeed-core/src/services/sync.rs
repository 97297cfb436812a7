//! Sync service - TrueLayer to transaction store pipeline
//!
//! Strictly sequential: exchange the authorization code, list accounts,
//! fetch the first account's transactions, then decode, categorize and
//! upsert each one. Stage failures abort the run; item failures are recorded and the
//! loop moves on.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, Category, Credentials, Environment, RawTransaction, StoredTransaction, Transaction,
};
use crate::ports::{
    AccountFetcher, BankDataProvider, Categorizer, TokenExchanger, TransactionFetcher,
    TransactionStore,
};

/// Where a run is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Init,
    TokenExchanged,
    AccountsFetched,
    TransactionsFetched,
    Reported,
    AuthFailed,
    NoAccounts,
    NoTransactions,
    TransactionFetchFailed,
    /// Timeout or connection failure at any stage
    NetworkFailed,
}

/// How a run that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    NoAccounts,
    NoTransactions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ItemOutcome {
    Synced,
    Failed(String),
    /// Dry run: categorized but not written
    Skipped,
}

/// Result for one transaction
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub transaction_id: String,
    pub description: String,
    /// Signed, as fetched
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: Category,
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn is_synced(&self) -> bool {
        self.outcome == ItemOutcome::Synced
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failed(_))
    }

    /// A page entry that could not be decoded into a transaction
    fn malformed(raw: &RawTransaction, error: Error) -> Self {
        Self {
            transaction_id: raw.id().unwrap_or("unknown").to_string(),
            description: raw.description().to_string(),
            amount: Decimal::ZERO,
            category: Category::Uncategorized,
            outcome: ItemOutcome::Failed(error.to_string()),
        }
    }
}

/// Summary of one sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub state: SyncState,
    pub outcome: SyncOutcome,
    pub environment: Environment,
    pub store: String,
    pub categorizer: String,
    pub dry_run: bool,
    /// The account that was synced (always the first one listed)
    pub account: Option<Account>,
    pub accounts_found: usize,
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
    pub items: Vec<ItemResult>,
    /// Returned by the token exchange; never persisted here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SyncReport {
    /// The "synced X/Y" line
    pub fn summary_line(&self) -> String {
        format!("synced {}/{}", self.synced, self.total)
    }
}

/// Progress notifications emitted while a run advances
#[derive(Debug)]
pub enum SyncEvent<'a> {
    Started { environment: Environment },
    TokenExchanged { has_refresh_token: bool },
    AccountsFetched { count: usize, selected: Option<&'a Account> },
    TransactionsFetched { count: usize },
    ItemProcessed { index: usize, total: usize, item: &'a ItemResult },
    Failed { state: SyncState, error: &'a Error },
}

/// Receives progress events; front ends print them, tests record them
pub trait SyncObserver {
    fn notify(&mut self, event: SyncEvent<'_>);
}

/// Observer that ignores everything
pub struct NoopObserver;

impl SyncObserver for NoopObserver {
    fn notify(&mut self, _event: SyncEvent<'_>) {}
}

/// Sync orchestrator
///
/// Every collaborator is injected; nothing is created from ambient state.
pub struct SyncService {
    token_exchanger: Arc<dyn TokenExchanger>,
    account_fetcher: Arc<dyn AccountFetcher>,
    transaction_fetcher: Arc<dyn TransactionFetcher>,
    categorizer: Arc<dyn Categorizer>,
    store: Arc<dyn TransactionStore>,
}

impl SyncService {
    pub fn new(
        token_exchanger: Arc<dyn TokenExchanger>,
        account_fetcher: Arc<dyn AccountFetcher>,
        transaction_fetcher: Arc<dyn TransactionFetcher>,
        categorizer: Arc<dyn Categorizer>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self {
            token_exchanger,
            account_fetcher,
            transaction_fetcher,
            categorizer,
            store,
        }
    }

    /// Use one provider for all three bank stages
    pub fn with_provider<P>(
        provider: Arc<P>,
        categorizer: Arc<dyn Categorizer>,
        store: Arc<dyn TransactionStore>,
    ) -> Self
    where
        P: BankDataProvider + 'static,
    {
        Self::new(
            provider.clone(),
            provider.clone(),
            provider,
            categorizer,
            store,
        )
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub fn categorizer_name(&self) -> &str {
        self.categorizer.name()
    }

    /// Run the pipeline once
    ///
    /// Returns `Err` for the run-fatal stages (token, accounts, transactions)
    /// after notifying the observer with the terminal state. Empty account or
    /// transaction lists are `Ok` with the matching `SyncOutcome`.
    pub fn sync(
        &self,
        credentials: &Credentials,
        dry_run: bool,
        observer: &mut dyn SyncObserver,
    ) -> Result<SyncReport> {
        let mut report = SyncReport {
            state: SyncState::Init,
            outcome: SyncOutcome::Completed,
            environment: credentials.environment,
            store: self.store.name().to_string(),
            categorizer: self.categorizer.name().to_string(),
            dry_run,
            account: None,
            accounts_found: 0,
            total: 0,
            synced: 0,
            failed: 0,
            items: Vec::new(),
            refresh_token: None,
        };
        observer.notify(SyncEvent::Started {
            environment: credentials.environment,
        });

        let tokens = self
            .token_exchanger
            .exchange_code(credentials)
            .map_err(|e| fail(observer, SyncState::AuthFailed, e))?;
        report.state = SyncState::TokenExchanged;
        report.refresh_token = tokens.refresh_token.clone();
        observer.notify(SyncEvent::TokenExchanged {
            has_refresh_token: tokens.refresh_token.is_some(),
        });

        let accounts = self
            .account_fetcher
            .get_accounts(&tokens.access_token)
            .map_err(|e| with_client_hint(e, credentials))
            .map_err(|e| fail(observer, SyncState::AuthFailed, e))?;
        report.state = SyncState::AccountsFetched;
        report.accounts_found = accounts.len();
        observer.notify(SyncEvent::AccountsFetched {
            count: accounts.len(),
            selected: accounts.first(),
        });

        // Single-account scope: index 0 only
        let Some(account) = accounts.into_iter().next() else {
            report.state = SyncState::NoAccounts;
            report.outcome = SyncOutcome::NoAccounts;
            return Ok(report);
        };

        let transactions = self
            .transaction_fetcher
            .get_transactions(&tokens.access_token, &account.account_id)
            .map_err(|e| fail(observer, SyncState::TransactionFetchFailed, e))?;
        report.account = Some(account);
        report.state = SyncState::TransactionsFetched;
        observer.notify(SyncEvent::TransactionsFetched {
            count: transactions.len(),
        });

        if transactions.is_empty() {
            report.state = SyncState::NoTransactions;
            report.outcome = SyncOutcome::NoTransactions;
            return Ok(report);
        }

        report.total = transactions.len();
        for (index, raw) in transactions.iter().enumerate() {
            let item = match raw.parse() {
                Ok(tx) => self.process(&tx, dry_run),
                Err(e) => ItemResult::malformed(raw, e),
            };
            if item.is_synced() {
                report.synced += 1;
            } else if item.is_failed() {
                report.failed += 1;
            }
            observer.notify(SyncEvent::ItemProcessed {
                index,
                total: report.total,
                item: &item,
            });
            report.items.push(item);
        }

        report.state = SyncState::Reported;
        Ok(report)
    }

    /// Categorize, then upsert one transaction
    fn process(&self, tx: &Transaction, dry_run: bool) -> ItemResult {
        let category = if tx.is_income() {
            Category::Income
        } else {
            self.categorizer.categorize(&tx.description)
        };
        let record = StoredTransaction::from_transaction(tx, category);

        let outcome = if dry_run {
            ItemOutcome::Skipped
        } else {
            match self.store.upsert_transaction(&record) {
                Ok(()) => ItemOutcome::Synced,
                Err(e) => ItemOutcome::Failed(e.to_string()),
            }
        };

        ItemResult {
            transaction_id: tx.transaction_id.clone(),
            description: tx.description.clone(),
            amount: tx.amount,
            category,
            outcome,
        }
    }
}

/// Report the terminal state; network trouble is told apart from refusals
fn fail(observer: &mut dyn SyncObserver, stage: SyncState, error: Error) -> Error {
    let state = match &error {
        Error::Transient(_) => SyncState::NetworkFailed,
        _ => stage,
    };
    observer.notify(SyncEvent::Failed {
        state,
        error: &error,
    });
    error
}

/// Point at the client id when the account listing is refused
fn with_client_hint(error: Error, credentials: &Credentials) -> Error {
    match error {
        Error::Auth { message, mut hints } => {
            hints.push(format!(
                "Client ID starts with: {}...",
                credentials.client_id_prefix()
            ));
            Error::Auth { message, hints }
        }
        other => other,
    }
}
