//! Page fetcher trait.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::page::FetchedPage;

/// Fetches a single page.
///
/// Rendering, retries and caching are the implementation's business. A page
/// that could not be fetched is an `Err`, never an empty `FetchedPage`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;
}
