//! Credentials and token domain models

use std::fmt;

use serde::Serialize;

/// TrueLayer environment a run talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    #[default]
    Live,
}

impl Environment {
    /// Token endpoint for the authorization-code exchange
    pub fn auth_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://auth.truelayer-sandbox.com/connect/token",
            Environment::Live => "https://auth.truelayer.com/connect/token",
        }
    }

    /// Base URL of the Data API
    pub fn api_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://api.truelayer-sandbox.com/data/v1",
            Environment::Live => "https://api.truelayer.com/data/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed for one authorization-code exchange
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_code: String,
    pub environment: Environment,
}

impl Credentials {
    /// First characters of the client id, safe to print in diagnostics
    pub fn client_id_prefix(&self) -> String {
        self.client_id.chars().take(20).collect()
    }
}

// Secrets stay out of debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id_prefix())
            .field("redirect_uri", &self.redirect_uri)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Access token plus the optional refresh token returned by the exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}
