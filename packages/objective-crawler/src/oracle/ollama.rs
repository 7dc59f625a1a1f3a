//! Ollama backend for the [`Oracle`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use objective_crawler::oracle::OllamaOracle;
//!
//! let oracle = OllamaOracle::from_env().with_base_url("http://gpu-box:11434");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};
use crate::traits::oracle::Oracle;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Local inference through Ollama's `/api/generate`.
#[derive(Clone)]
pub struct OllamaOracle {
    client: Client,
    base_url: String,
}

impl Default for OllamaOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaOracle {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }

    /// Use `OLLAMA_HOST` when set, the local default otherwise.
    pub fn from_env() -> Self {
        match std::env::var("OLLAMA_HOST") {
            Ok(host) if !host.trim().is_empty() => Self::new().with_base_url(host),
            _ => Self::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = if url.starts_with("http://") || url.starts_with("https://") {
            url
        } else {
            format!("http://{url}")
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn generate(&self, model: &str, prompt: &str) -> OracleResult<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Http(Box::new(e)))?;

        if parsed.response.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_scheme() {
        assert_eq!(
            OllamaOracle::new().with_base_url("gpu-box:11434").base_url(),
            "http://gpu-box:11434"
        );
        assert_eq!(
            OllamaOracle::new()
                .with_base_url("https://ollama.internal")
                .base_url(),
            "https://ollama.internal"
        );
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(GenerateRequest {
            model: "deepseek-r1:14b",
            prompt: "hi",
            stream: false,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "deepseek-r1:14b", "prompt": "hi", "stream": false})
        );
    }
}
