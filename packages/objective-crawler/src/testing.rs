//! Testing utilities including mock collaborators.
//!
//! Useful for exercising the crawler without a network or an LLM. Both mocks
//! are cheap to clone and share their state, so a test can hand one clone to
//! the crawler and keep another for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, OracleError, OracleResult};
use crate::traits::{fetcher::PageFetcher, oracle::Oracle};
use crate::types::page::FetchedPage;

/// Reply given when no rule matches a prompt.
const DEFAULT_REPLY: &str = "{}";

/// A mock Oracle with substring-matched canned replies.
///
/// Rules are checked in the order they were added; the first rule whose
/// needle occurs in the prompt wins.
#[derive(Clone, Default)]
pub struct MockOracle {
    /// (needle, reply) pairs
    replies: Arc<RwLock<Vec<(String, String)>>>,

    /// Needles whose prompts fail
    failures: Arc<RwLock<Vec<String>>>,

    /// Reply when nothing matches
    default_reply: Arc<RwLock<Option<String>>>,

    /// Every call fails
    fail_all: bool,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockOracleCall>>>,
}

/// Record of a call made to the mock Oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct MockOracleCall {
    pub model: String,
    pub prompt: String,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` to any prompt containing `needle`.
    pub fn with_reply_containing(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies
            .write()
            .unwrap()
            .push((needle.into(), reply.into()));
        self
    }

    /// Fail any prompt containing `needle`.
    pub fn with_failure_containing(self, needle: impl Into<String>) -> Self {
        self.failures.write().unwrap().push(needle.into());
        self
    }

    /// Reply used when no rule matches.
    pub fn with_default_reply(self, reply: impl Into<String>) -> Self {
        *self.default_reply.write().unwrap() = Some(reply.into());
        self
    }

    /// Simulate a total backend outage.
    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockOracleCall> {
        self.calls.read().unwrap().clone()
    }

    /// Calls whose prompt contained `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|call| call.prompt.contains(needle))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn generate(&self, model: &str, prompt: &str) -> OracleResult<String> {
        self.calls.write().unwrap().push(MockOracleCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.fail_all
            || self
                .failures
                .read()
                .unwrap()
                .iter()
                .any(|needle| prompt.contains(needle.as_str()));
        if failing {
            return Err(OracleError::Backend {
                status: 503,
                body: "mock oracle unavailable".to_string(),
            });
        }

        let matched = self
            .replies
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        Ok(matched
            .or_else(|| self.default_reply.read().unwrap().clone())
            .unwrap_or_else(|| DEFAULT_REPLY.to_string()))
    }
}

/// A mock fetcher serving canned pages.
///
/// Unknown URLs answer 404; URLs registered with [`MockFetcher::fail_url`]
/// answer 500.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    failures: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        let page = FetchedPage::new(url.clone(), html);
        self.pages.write().unwrap().insert(url, page);
        self
    }

    /// Serve a fully specified page at its URL.
    pub fn with_fetched_page(self, page: FetchedPage) -> Self {
        self.pages.write().unwrap().insert(page.url.clone(), page);
        self
    }

    /// Make fetches of `url` fail.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// URLs fetched, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failures.read().unwrap().contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
