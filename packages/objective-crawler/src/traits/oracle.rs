//! Oracle trait for LLM inference.

use async_trait::async_trait;

use crate::error::OracleResult;

/// Free-form text generation.
///
/// Implementations wrap a specific inference backend. They return the raw
/// reply; cleaning and parsing belong to [`crate::oracle::OracleAdapter`].
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer `prompt` using `model`.
    async fn generate(&self, model: &str, prompt: &str) -> OracleResult<String>;
}
