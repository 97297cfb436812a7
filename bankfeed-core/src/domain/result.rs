//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Pipeline stages (token exchange, account and transaction fetches) surface
/// `Auth` and `Transient` to the caller and abort the run. `Categorization`
/// and `Persistence` are per-transaction and are absorbed by the sync loop.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization failed: {message}")]
    Auth { message: String, hints: Vec<String> },

    #[error("Network error: {0}")]
    Transient(String),

    #[error("Categorization error: {0}")]
    Categorization(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authorization error without hints
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
            hints: Vec::new(),
        }
    }

    /// Create an authorization error carrying operator hints
    pub fn auth_with_hints(msg: impl Into<String>, hints: Vec<String>) -> Self {
        Self::Auth {
            message: msg.into(),
            hints,
        }
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Diagnostic hints attached to the error, if any
    pub fn hints(&self) -> &[String] {
        match self {
            Self::Auth { hints, .. } => hints,
            _ => &[],
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
