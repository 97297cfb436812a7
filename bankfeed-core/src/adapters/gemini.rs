//! Gemini text-generation client
//!
//! Used only by delegated categorization. One `generateContent` call per
//! prompt, bounded by the same timeout as the bank calls, never retried.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::ports::TextGenerator;

/// Default production API URL
const GEMINI_PRODUCTION_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini API client
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        Self::new_with_base_url(api_key, GEMINI_PRODUCTION_URL)
    }

    pub fn new_with_base_url(api_key: &str, base_url: &str) -> anyhow::Result<Self> {
        if api_key.is_empty() {
            anyhow::bail!("Gemini API key cannot be empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> DomainResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| DomainError::Categorization(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Categorization(format!(
                "Gemini API error: HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            DomainError::Categorization(format!("Failed to parse Gemini response: {}", e))
        })?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| DomainError::Categorization("Gemini returned no text".to_string()))
    }
}
