//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - TrueLayer Data API client for the bank ports
//! - Supabase (PostgREST) and DuckDB for the TransactionStore port
//! - Gemini for the TextGenerator port used by delegated categorization

pub mod duckdb;
pub mod gemini;
pub mod supabase;
pub mod truelayer;

#[cfg(test)]
pub mod truelayer_mock;
