//! Open-banking provider ports
//!
//! One trait per pipeline stage so the orchestrator (and tests) can swap
//! each stage independently. Every call is attempted exactly once.

use crate::domain::result::Result;
use crate::domain::{Account, Credentials, RawTransaction, TokenPair};

/// Exchanges a single-use authorization code for tokens
pub trait TokenExchanger: Send + Sync {
    /// Perform the authorization-code exchange
    ///
    /// Fails with `Error::Auth` on a non-200 status, an unreadable body or a
    /// missing `access_token`, and with `Error::Transient` on timeout or
    /// connection failure.
    fn exchange_code(&self, credentials: &Credentials) -> Result<TokenPair>;
}

/// Lists the accounts an access token can see
pub trait AccountFetcher: Send + Sync {
    /// Accounts in the order the provider returned them (may be empty)
    fn get_accounts(&self, access_token: &str) -> Result<Vec<Account>>;
}

/// Retrieves transactions for one account
pub trait TransactionFetcher: Send + Sync {
    /// First page of the account's transactions (may be empty)
    ///
    /// Entries are returned undecoded; a malformed one is the caller's
    /// per-item failure, not a failed fetch.
    fn get_transactions(&self, access_token: &str, account_id: &str)
        -> Result<Vec<RawTransaction>>;
}

/// A provider that covers every stage of the pipeline
pub trait BankDataProvider: TokenExchanger + AccountFetcher + TransactionFetcher {
    /// Provider name (e.g., "truelayer")
    fn name(&self) -> &str;
}
