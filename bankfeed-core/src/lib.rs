//! Bankfeed Core - TrueLayer bank transactions into a transaction store
//!
//! This crate implements the sync pipeline following hexagonal architecture:
//!
//! - **domain**: Core entities (Credentials, Account, Transaction, Category)
//! - **ports**: Trait definitions for the bank stages, categorization and storage
//! - **services**: Sync orchestration, categorization, summaries, logging
//! - **adapters**: Concrete implementations (TrueLayer, Supabase, DuckDB, Gemini)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbStore;
use adapters::gemini::GeminiClient;
use adapters::supabase::SupabaseStore;
use adapters::truelayer::TrueLayerClient;
use config::{CategorizerKind, Config, StoreBackend};
use ports::{Categorizer, TransactionStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Account, Category, Credentials, Environment, RawTransaction, StoredTransaction, Transaction,
};

/// File name of the local store inside the data directory
pub const STORE_DB_FILE: &str = "bankfeed.duckdb";

/// Main context for bankfeed operations
///
/// Builds the configured clients once and hands them to the services as
/// explicit dependencies.
pub struct BankfeedContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub store: Arc<dyn TransactionStore>,
    pub category_service: CategoryService,
    pub summary_service: SummaryService,
}

impl BankfeedContext {
    /// Load configuration from `data_dir` and open the configured store
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::from_config(data_dir, config)
    }

    pub fn from_config(data_dir: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let store = build_store(&config, data_dir)?;
        let category_service = CategoryService::new(Arc::clone(&store));
        let summary_service = SummaryService::new(Arc::clone(&store));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            store,
            category_service,
            summary_service,
        })
    }

    /// Sync service wired to TrueLayer, the configured categorizer and store
    ///
    /// Built on demand so commands that never sync do not need a model key.
    pub fn sync_service(&self) -> Result<SyncService> {
        let bank = Arc::new(build_bank(&self.config)?);
        let categorizer = build_categorizer(&self.config)?;
        Ok(SyncService::with_provider(
            bank,
            categorizer,
            Arc::clone(&self.store),
        ))
    }
}

/// Sync service for dry runs
///
/// Dry runs never write, so the configured store is not opened and needs no
/// credentials; a scratch in-memory store stands in for it.
pub fn dry_run_sync_service(config: &Config) -> Result<SyncService> {
    let bank = Arc::new(build_bank(config)?);
    let categorizer = build_categorizer(config)?;
    let store: Arc<dyn TransactionStore> =
        Arc::new(DuckDbStore::open_in_memory().context("Failed to open scratch store")?);
    Ok(SyncService::with_provider(bank, categorizer, store))
}

/// TrueLayer client for the configured environment and endpoint overrides
pub fn build_bank(config: &Config) -> Result<TrueLayerClient> {
    let env = config.environment;
    TrueLayerClient::new_with_urls(
        env,
        config.auth_url.as_deref().unwrap_or(env.auth_url()),
        config.api_url.as_deref().unwrap_or(env.api_url()),
    )
}

pub fn build_categorizer(config: &Config) -> Result<Arc<dyn Categorizer>> {
    let categorizer: Arc<dyn Categorizer> = match config.categorizer {
        CategorizerKind::Rules => Arc::new(RuleCategorizer::new()),
        CategorizerKind::Gemini => {
            let client = GeminiClient::new(config.gemini_key()?)?;
            Arc::new(DelegatedCategorizer::new(Arc::new(client), config.model.clone()))
        }
    };
    Ok(categorizer)
}

pub fn build_store(config: &Config, data_dir: &Path) -> Result<Arc<dyn TransactionStore>> {
    let store: Arc<dyn TransactionStore> = match config.store {
        StoreBackend::Supabase => {
            let (url, key) = config.supabase_credentials()?;
            Arc::new(SupabaseStore::new(url, key)?)
        }
        StoreBackend::DuckDb => {
            let path = data_dir.join(STORE_DB_FILE);
            Arc::new(
                DuckDbStore::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
    };
    Ok(store)
}
