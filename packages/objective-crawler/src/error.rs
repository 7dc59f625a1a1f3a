//! Typed errors for the crawler.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only [`ConfigError`]
//! ever escapes a crawl; fetch and oracle failures are recovered at the call
//! site that produced them.

use thiserror::Error;

/// Errors produced while fetching a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Fetch exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors produced by an Oracle backend call.
///
/// A malformed reply is not an `OracleError`; it surfaces as
/// [`crate::oracle::OracleOutcome::FormatInvalid`].
#[derive(Debug, Error)]
pub enum OracleError {
    /// Transport-level failure talking to the inference backend
    #[error("oracle HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend answered with a non-success status
    #[error("oracle backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    /// Backend answered but carried no text
    #[error("oracle returned an empty response")]
    EmptyResponse,

    /// Call exceeded the per-call deadline
    #[error("oracle call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Invalid crawl configuration. The only error class that aborts a crawl,
/// and it does so before anything is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Start URL failed to parse
    #[error("invalid start URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Start URL uses something other than http/https
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Start URL has no host to scope the crawl to
    #[error("start URL has no host: {0}")]
    MissingHost(String),

    /// `max_pages` must be positive
    #[error("max_pages must be greater than zero")]
    ZeroMaxPages,

    /// `concurrency` outside 1..=10
    #[error("concurrency must be between 1 and 10, got {0}")]
    ConcurrencyOutOfRange(usize),

    /// Recon fraction outside (0, 1]
    #[error("recon fraction must be in (0, 1], got {0}")]
    InvalidReconFraction(f64),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for oracle backend calls.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
