//! Bank account domain model

use serde::{Deserialize, Serialize};

/// A bank account as listed by the Data API
///
/// Fetched fresh on every run and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    #[serde(default = "unknown")]
    pub display_name: String,
    #[serde(default = "unknown")]
    pub account_type: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl Account {
    pub fn new(
        account_id: impl Into<String>,
        display_name: impl Into<String>,
        account_type: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            account_type: account_type.into(),
        }
    }
}
