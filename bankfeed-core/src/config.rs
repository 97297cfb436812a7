//! Configuration management
//!
//! Settings come from `settings.json` in the data directory, then
//! environment variables override them key by key:
//! ```json
//! {
//!   "truelayer": { "clientId": "...", "redirectUri": "...", "useSandbox": true },
//!   "store": { "backend": "duckdb" },
//!   "categorizer": { "strategy": "rules", "model": "gemini-1.5-flash" }
//! }
//! ```
//! Secrets can live in either place, but the environment (or a `.env`
//! file loaded by the CLI) is the usual home for them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Credentials, Environment};
use crate::services::DEFAULT_MODEL;

/// Redirect URI registered for console-issued auth codes
pub const DEFAULT_REDIRECT_URI: &str = "https://console.truelayer.com/redirect-page";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    truelayer: TrueLayerSettings,
    #[serde(default)]
    store: StoreSettings,
    #[serde(default)]
    categorizer: CategorizerSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrueLayerSettings {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_code: Option<String>,
    redirect_uri: Option<String>,
    use_sandbox: Option<bool>,
    auth_url: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSettings {
    backend: Option<String>,
    supabase_url: Option<String>,
    supabase_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategorizerSettings {
    strategy: Option<String>,
    model: Option<String>,
    gemini_api_key: Option<String>,
}

/// Where synced transactions are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Supabase,
    DuckDb,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "duckdb" | "local" => Ok(StoreBackend::DuckDb),
            other => Err(Error::Config(format!(
                "Unknown store '{}' (expected supabase or duckdb)",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Supabase => f.write_str("supabase"),
            StoreBackend::DuckDb => f.write_str("duckdb"),
        }
    }
}

/// Which categorization strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorizerKind {
    Rules,
    Gemini,
}

impl FromStr for CategorizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "keywords" => Ok(CategorizerKind::Rules),
            "gemini" | "ai" => Ok(CategorizerKind::Gemini),
            other => Err(Error::Config(format!(
                "Unknown categorizer '{}' (expected rules or gemini)",
                other
            ))),
        }
    }
}

/// Resolved configuration
#[derive(Clone)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorization_code: Option<String>,
    pub redirect_uri: String,
    pub environment: Environment,
    /// Endpoint overrides, mainly for mock servers
    pub auth_url: Option<String>,
    pub api_url: Option<String>,
    pub store: StoreBackend,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub categorizer: CategorizerKind,
    pub model: String,
    pub gemini_api_key: Option<String>,
}

// Secrets stay out of debug output
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("redirect_uri", &self.redirect_uri)
            .field("store", &self.store)
            .field("categorizer", &self.categorizer)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// First non-empty value of the listed environment keys
fn first_var<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|k| env(k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load settings.json from `data_dir`, overridden by the process environment
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Same as `load` with an explicit environment lookup
    pub fn load_with_env<F>(data_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = data_dir.join("settings.json");
        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let tl = raw.truelayer;
        let use_sandbox = match first_var(&env, &["TRUELAYER_USE_SANDBOX"]) {
            Some(v) => parse_flag(&v).ok_or_else(|| {
                Error::Config(format!("TRUELAYER_USE_SANDBOX must be true or false, got '{}'", v))
            })?,
            None => tl.use_sandbox.unwrap_or(false),
        };

        let supabase_url = first_var(&env, &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
            .or_else(|| non_empty(raw.store.supabase_url));
        let supabase_key = first_var(&env, &["SUPABASE_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"])
            .or_else(|| non_empty(raw.store.supabase_key));

        let store = match first_var(&env, &["BANKFEED_STORE"]).or_else(|| non_empty(raw.store.backend)) {
            Some(name) => name.parse::<StoreBackend>()?,
            None if supabase_url.is_some() && supabase_key.is_some() => StoreBackend::Supabase,
            None => StoreBackend::DuckDb,
        };

        let categorizer = match first_var(&env, &["BANKFEED_CATEGORIZER"])
            .or_else(|| non_empty(raw.categorizer.strategy))
        {
            Some(name) => name.parse::<CategorizerKind>()?,
            None => CategorizerKind::Rules,
        };

        Ok(Self {
            client_id: first_var(&env, &["TRUELAYER_CLIENT_ID"]).or_else(|| non_empty(tl.client_id)),
            client_secret: first_var(&env, &["TRUELAYER_CLIENT_SECRET"])
                .or_else(|| non_empty(tl.client_secret)),
            authorization_code: first_var(&env, &["TRUELAYER_AUTH_CODE"])
                .or_else(|| non_empty(tl.auth_code)),
            redirect_uri: first_var(&env, &["TRUELAYER_REDIRECT_URI"])
                .or_else(|| non_empty(tl.redirect_uri))
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            environment: if use_sandbox {
                Environment::Sandbox
            } else {
                Environment::Live
            },
            auth_url: first_var(&env, &["TRUELAYER_AUTH_URL"]).or_else(|| non_empty(tl.auth_url)),
            api_url: first_var(&env, &["TRUELAYER_API_URL"]).or_else(|| non_empty(tl.api_url)),
            store,
            supabase_url,
            supabase_key,
            categorizer,
            model: first_var(&env, &["BANKFEED_MODEL"])
                .or_else(|| non_empty(raw.categorizer.model))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_key: first_var(&env, &["GEMINI_API_KEY"])
                .or_else(|| non_empty(raw.categorizer.gemini_api_key)),
        })
    }

    /// Credentials for one run, or a config error naming every missing key
    pub fn credentials(&self) -> Result<Credentials> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("TRUELAYER_CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("TRUELAYER_CLIENT_SECRET");
        }
        if self.authorization_code.is_none() {
            missing.push("TRUELAYER_AUTH_CODE");
        }

        match (&self.client_id, &self.client_secret, &self.authorization_code) {
            (Some(id), Some(secret), Some(code)) => Ok(Credentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
                redirect_uri: self.redirect_uri.clone(),
                authorization_code: code.clone(),
                environment: self.environment,
            }),
            _ => Err(Error::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Supabase project URL and key, required when the store is Supabase
    pub fn supabase_credentials(&self) -> Result<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.supabase_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("SUPABASE_URL");
                }
                if key.is_none() {
                    missing.push("SUPABASE_KEY");
                }
                Err(Error::Config(format!(
                    "Missing required configuration: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Gemini API key, required when the categorizer is Gemini
    pub fn gemini_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("Missing required configuration: GEMINI_API_KEY".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_settings() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(dir.path(), env_from(&[])).unwrap();

        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.store, StoreBackend::DuckDb);
        assert_eq!(config.categorizer, CategorizerKind::Rules);
        assert_eq!(config.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_missing_credentials_are_all_named() {
        let dir = tempdir().unwrap();
        let config =
            Config::load_with_env(dir.path(), env_from(&[("TRUELAYER_CLIENT_ID", "id")])).unwrap();

        let err = config.credentials().unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::Config(_)));
        assert!(message.contains("TRUELAYER_CLIENT_SECRET"));
        assert!(message.contains("TRUELAYER_AUTH_CODE"));
        assert!(!message.contains("TRUELAYER_CLIENT_ID"));
    }

    #[test]
    fn test_env_credentials_and_sandbox() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env_from(&[
                ("TRUELAYER_CLIENT_ID", "sandbox-app"),
                ("TRUELAYER_CLIENT_SECRET", "secret"),
                ("TRUELAYER_AUTH_CODE", "code"),
                ("TRUELAYER_USE_SANDBOX", "YES"),
            ]),
        )
        .unwrap();

        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.environment, Environment::Sandbox);
        assert_eq!(credentials.authorization_code, "code");
    }

    #[test]
    fn test_blank_env_value_counts_as_missing() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env_from(&[
                ("TRUELAYER_CLIENT_ID", "id"),
                ("TRUELAYER_CLIENT_SECRET", "secret"),
                ("TRUELAYER_AUTH_CODE", "   "),
            ]),
        )
        .unwrap();
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_env_overrides_settings_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "truelayer": { "clientId": "from-file", "useSandbox": true },
                "categorizer": { "strategy": "gemini", "model": "gemini-pro" }
            }"#,
        )
        .unwrap();

        let config = Config::load_with_env(
            dir.path(),
            env_from(&[("TRUELAYER_CLIENT_ID", "from-env"), ("TRUELAYER_USE_SANDBOX", "false")]),
        )
        .unwrap();

        assert_eq!(config.client_id.as_deref(), Some("from-env"));
        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.categorizer, CategorizerKind::Gemini);
        assert_eq!(config.model, "gemini-pro");
        assert!(config.gemini_key().is_err());
    }

    #[test]
    fn test_supabase_selected_when_configured() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env_from(&[
                ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co"),
                ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
            ]),
        )
        .unwrap();

        assert_eq!(config.store, StoreBackend::Supabase);
        assert_eq!(
            config.supabase_credentials().unwrap(),
            ("https://abc.supabase.co", "anon")
        );
    }

    #[test]
    fn test_explicit_supabase_without_credentials() {
        let dir = tempdir().unwrap();
        let config =
            Config::load_with_env(dir.path(), env_from(&[("BANKFEED_STORE", "supabase")])).unwrap();
        let err = config.supabase_credentials().unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL, SUPABASE_KEY"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        assert!(Config::load_with_env(dir.path(), env_from(&[("BANKFEED_STORE", "s3")])).is_err());
        assert!(
            Config::load_with_env(dir.path(), env_from(&[("TRUELAYER_USE_SANDBOX", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env_from(&[("TRUELAYER_CLIENT_SECRET", "hunter2"), ("GEMINI_API_KEY", "g-key")]),
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("g-key"));
    }
}
