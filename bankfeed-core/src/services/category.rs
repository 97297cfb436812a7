//! Category service - manual recategorization of stored transactions

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::Category;
use crate::ports::TransactionStore;

pub struct CategoryService {
    store: Arc<dyn TransactionStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Overwrite the category of one stored transaction
    ///
    /// The label must belong to the closed set; the next sync of the same
    /// transaction will categorize it again.
    pub fn set_category(&self, truelayer_id: &str, category: &str) -> Result<Category> {
        let truelayer_id = truelayer_id.trim();
        if truelayer_id.is_empty() {
            return Err(Error::validation("Transaction id cannot be empty"));
        }
        let category: Category = category.parse()?;

        if !self.store.update_category(truelayer_id, category.as_str())? {
            return Err(Error::not_found(format!("Transaction {}", truelayer_id)));
        }
        Ok(category)
    }
}
