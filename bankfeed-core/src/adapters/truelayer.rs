//! TrueLayer Data API client
//!
//! Handles the authorization-code token exchange and the account and
//! transaction reads the sync pipeline needs.
//!
//! API Documentation: https://docs.truelayer.com/docs/data-api-basics
//!
//! Only the first page of transactions is read; pagination is not followed.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{Account, Credentials, Environment, RawTransaction, TokenPair};
use crate::ports::{AccountFetcher, BankDataProvider, TokenExchanger, TransactionFetcher};

// =============================================================================
// API Response Models
// =============================================================================

/// Token endpoint success body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Every Data API list endpoint wraps its items in `results`
#[derive(Debug, Deserialize)]
struct ResultsResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

// =============================================================================
// TrueLayer HTTP Client
// =============================================================================

/// Default per-call timeout; calls are never retried
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// TrueLayer API client
#[derive(Debug)]
pub struct TrueLayerClient {
    client: Client,
    environment: Environment,
    auth_url: String,
    api_url: String,
    timeout: Duration,
}

impl TrueLayerClient {
    /// Create a client for the environment's public endpoints
    pub fn new(environment: Environment) -> anyhow::Result<Self> {
        Self::new_with_urls(environment, environment.auth_url(), environment.api_url())
    }

    /// Create a client against custom endpoints (mock servers, proxies)
    pub fn new_with_urls(
        environment: Environment,
        auth_url: &str,
        api_url: &str,
    ) -> anyhow::Result<Self> {
        Self::new_with_timeout(
            environment,
            auth_url,
            api_url,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a client with a custom per-call timeout
    pub fn new_with_timeout(
        environment: Environment,
        auth_url: &str,
        api_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        if auth_url.trim().is_empty() || api_url.trim().is_empty() {
            anyhow::bail!("TrueLayer endpoint URLs cannot be empty");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            environment,
            auth_url: auth_url.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exchange the authorization code for an access/refresh token pair
    pub fn exchange_code(&self, credentials: &Credentials) -> DomainResult<TokenPair> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("code", credentials.authorization_code.as_str()),
        ];

        let response = self
            .client
            .post(&self.auth_url)
            .form(&form)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status().as_u16();
        let body = self.read_body(response)?;

        if status != 200 {
            return Err(DomainError::auth_with_hints(
                format!("Token exchange failed (HTTP {}): {}", status, error_summary(&body)),
                vec![
                    "Your authorization code may have expired. Auth codes only last 10 minutes."
                        .to_string(),
                    "Generate a new one and update TRUELAYER_AUTH_CODE.".to_string(),
                ],
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            DomainError::auth(format!("Token response could not be parsed: {}", e))
        })?;

        let access_token = token
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DomainError::auth(format!("No access token in response: {}", error_summary(&body)))
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token: token.refresh_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// List accounts visible to the access token
    pub fn get_accounts(&self, access_token: &str) -> DomainResult<Vec<Account>> {
        let url = format!("{}/accounts", self.api_url);
        let response: ResultsResponse<Account> = self
            .get_json(&url, access_token, "Accounts", || {
                vec![
                    format!("Using environment: {}", self.environment.as_str().to_uppercase()),
                    format!("API URL: {}", self.api_url),
                    "The token may lack the 'accounts' scope or the bank consent may have expired."
                        .to_string(),
                ]
            })?;

        Ok(response.results)
    }

    /// Fetch the first page of transactions for one account
    pub fn get_transactions(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> DomainResult<Vec<RawTransaction>> {
        let url = format!("{}/accounts/{}/transactions", self.api_url, account_id);
        let response: ResultsResponse<RawTransaction> =
            self.get_json(&url, access_token, "Transactions", || {
                vec![
                    "The access token may not have the 'transactions' scope.".to_string(),
                    "Your bank consent may not include transaction access.".to_string(),
                    "The consent may have expired (usually after 90 days).".to_string(),
                    "Try generating a new auth code with the 'transactions' scope selected."
                        .to_string(),
                ]
            })?;

        Ok(response.results)
    }

    /// Authenticated GET returning a parsed JSON body
    fn get_json<T, F>(
        &self,
        url: &str,
        access_token: &str,
        what: &str,
        hints: F,
    ) -> DomainResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Vec<String>,
    {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header("Content-Type", "application/json")
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status().as_u16();
        let body = self.read_body(response)?;

        if status != 200 {
            return Err(DomainError::auth_with_hints(
                format!("{} request failed (HTTP {}): {}", what, status, describe_status(status, &body)),
                hints(),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            DomainError::auth(format!("{} response could not be parsed: {}", what, e))
        })
    }

    /// Map request errors to the transient error class
    fn request_error(&self, error: reqwest::Error) -> DomainError {
        if error.is_timeout() {
            DomainError::Transient(format!(
                "Request timed out after {:.1} seconds. Check your internet connection.",
                self.timeout.as_secs_f64()
            ))
        } else if error.is_connect() {
            DomainError::Transient("Unable to connect to TrueLayer servers".to_string())
        } else {
            DomainError::Transient(format!("TrueLayer request failed: {}", error))
        }
    }

    fn read_body(&self, response: Response) -> DomainResult<String> {
        response.text().map_err(|e| self.request_error(e))
    }
}

/// Short human-readable form of an error body
fn error_summary(body: &str) -> String {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(json) => {
            let error = json.get("error").and_then(|v| v.as_str());
            let description = json
                .get("error_description")
                .and_then(|v| v.as_str());
            match (error, description) {
                (Some(e), Some(d)) => format!("{} ({})", e, d),
                (Some(e), None) => e.to_string(),
                _ => json.to_string(),
            }
        }
        Err(_) => body.chars().take(200).collect(),
    }
}

fn describe_status(status: u16, body: &str) -> String {
    let summary = error_summary(body);
    match status {
        401 => format!("access token rejected: {}", summary),
        403 => format!("insufficient scope or consent: {}", summary),
        429 => format!("rate limit exceeded: {}", summary),
        _ => summary,
    }
}

// =============================================================================
// Port implementations
// =============================================================================

impl TokenExchanger for TrueLayerClient {
    fn exchange_code(&self, credentials: &Credentials) -> DomainResult<TokenPair> {
        TrueLayerClient::exchange_code(self, credentials)
    }
}

impl AccountFetcher for TrueLayerClient {
    fn get_accounts(&self, access_token: &str) -> DomainResult<Vec<Account>> {
        TrueLayerClient::get_accounts(self, access_token)
    }
}

impl TransactionFetcher for TrueLayerClient {
    fn get_transactions(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> DomainResult<Vec<RawTransaction>> {
        TrueLayerClient::get_transactions(self, access_token, account_id)
    }
}

impl BankDataProvider for TrueLayerClient {
    fn name(&self) -> &str {
        "truelayer"
    }
}

// =============================================================================
// Tests
// =============================================================================
