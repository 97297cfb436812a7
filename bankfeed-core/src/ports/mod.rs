//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The sync pipeline
//! depends only on these traits, not on concrete implementations.

mod bank;
mod categorizer;
mod store;

pub use bank::{AccountFetcher, BankDataProvider, TokenExchanger, TransactionFetcher};
pub use categorizer::{Categorizer, TextGenerator};
pub use store::{TransactionStore, CONFLICT_KEY, TRANSACTIONS_TABLE};
