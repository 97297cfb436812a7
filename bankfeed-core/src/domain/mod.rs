//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod category;
mod credentials;
mod transaction;
pub mod result;

pub use account::Account;
pub use category::Category;
pub use credentials::{Credentials, Environment, TokenPair};
pub use transaction::{RawTransaction, StoredTransaction, Transaction};
