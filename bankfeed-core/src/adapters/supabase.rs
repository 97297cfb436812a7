//! Supabase (PostgREST) transaction store
//!
//! Writes go to `/rest/v1/transactions` with `on_conflict=truelayer_id` and
//! merge-duplicates resolution, which makes every write an upsert.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder};
use url::Url;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::StoredTransaction;
use crate::ports::{TransactionStore, CONFLICT_KEY, TRANSACTIONS_TABLE};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Supabase REST client scoped to the transactions table
#[derive(Debug)]
pub struct SupabaseStore {
    client: Client,
    table_url: Url,
    api_key: String,
}

impl SupabaseStore {
    /// Create a store for the project at `project_url` (e.g. https://xyz.supabase.co)
    pub fn new(project_url: &str, api_key: &str) -> anyhow::Result<Self> {
        if api_key.is_empty() {
            anyhow::bail!("Supabase API key cannot be empty");
        }

        let base = Url::parse(project_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid Supabase URL: {}", project_url))?;
        let table_url = base
            .join(&format!("rest/v1/{}", TRANSACTIONS_TABLE))
            .context("Failed to build Supabase table URL")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            table_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn url_with(&self, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().extend_pairs(pairs);
        url
    }
}

fn request_error(error: reqwest::Error) -> DomainError {
    if error.is_timeout() {
        DomainError::persistence("Supabase request timed out")
    } else {
        DomainError::persistence(format!("Supabase request failed: {}", error))
    }
}

fn status_error(status: reqwest::StatusCode, body: String) -> DomainError {
    let body: String = body.chars().take(200).collect();
    DomainError::persistence(format!("Supabase error: HTTP {} {}", status.as_u16(), body))
}

impl TransactionStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    fn upsert_transaction(&self, tx: &StoredTransaction) -> DomainResult<()> {
        let url = self.url_with(&[("on_conflict", CONFLICT_KEY)]);
        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(tx)
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().unwrap_or_default()));
        }
        Ok(())
    }

    fn list_transactions(&self) -> DomainResult<Vec<StoredTransaction>> {
        let url = self.url_with(&[("select", "*"), ("order", "date.desc")]);
        let response = self
            .authorized(self.client.get(url))
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().unwrap_or_default()));
        }

        response
            .json()
            .map_err(|e| DomainError::persistence(format!("Failed to parse Supabase rows: {}", e)))
    }

    fn update_category(&self, truelayer_id: &str, category: &str) -> DomainResult<bool> {
        let filter = format!("eq.{}", truelayer_id);
        let url = self.url_with(&[(CONFLICT_KEY, filter.as_str())]);
        let response = self
            .authorized(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "category": category }))
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.text().unwrap_or_default()));
        }

        let updated: Vec<serde_json::Value> = response
            .json()
            .map_err(|e| DomainError::persistence(format!("Failed to parse Supabase rows: {}", e)))?;
        Ok(!updated.is_empty())
    }
}
