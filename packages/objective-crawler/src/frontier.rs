//! Frontier: the de-duplicated queue of URLs still to visit.
//!
//! The frontier also owns the visited set. A URL is marked visited the moment
//! it is handed out in a batch, before any fetch starts, so two tasks in the
//! same batch can never receive the same URL and a failed fetch still
//! consumes budget.

use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use url::Url;

use crate::types::link::UrlCandidate;

#[derive(Debug, Clone)]
pub struct Frontier {
    host: String,
    port: Option<u16>,
    queue: VecDeque<String>,
    queued: HashSet<String>,
    visited: IndexSet<String>,
    /// Redirect targets of fetched pages; never fetched, never counted
    redirected: HashSet<String>,
}

impl Frontier {
    /// Frontier scoped to the host (and explicit port) of `base`.
    pub fn new(base: &Url) -> Self {
        Self {
            host: base.host_str().unwrap_or_default().to_lowercase(),
            port: base.port(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: IndexSet::new(),
            redirected: HashSet::new(),
        }
    }

    /// Queue a candidate.
    ///
    /// Returns false without changing anything when the URL is malformed,
    /// off-host, already visited or already queued.
    pub fn enqueue(&mut self, candidate: &UrlCandidate) -> bool {
        self.enqueue_url(&candidate.url)
    }

    /// Queue a bare URL. Same rules as [`Frontier::enqueue`].
    pub fn enqueue_url(&mut self, url: &str) -> bool {
        if self.is_visited(url) || self.queued.contains(url) {
            return false;
        }
        if !self.is_in_scope(url) {
            debug!(url = %url, "Dropping off-host or malformed URL");
            return false;
        }

        self.queued.insert(url.to_string());
        self.queue.push_back(url.to_string());
        true
    }

    /// Pop up to `n` URLs in FIFO order, marking each visited.
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(n.min(self.queue.len()));
        while batch.len() < n {
            let Some(url) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&url);
            if self.redirected.contains(&url) {
                continue;
            }
            if self.visited.insert(url.clone()) {
                batch.push(url);
            }
        }
        batch
    }

    /// Drop everything still queued. Visited URLs stay visited.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    /// Whether `url` shares the crawl's host and port exactly.
    pub fn is_in_scope(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                parsed.host_str().map(str::to_lowercase).as_deref() == Some(self.host.as_str())
                    && parsed.port() == self.port
            }
            Err(_) => false,
        }
    }

    /// Whether `url` was handed out, or reached by redirect from a URL that was.
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url) || self.redirected.contains(url)
    }

    /// Record where a fetched URL redirected to. The target is treated as
    /// visited from now on without counting against the budget.
    pub fn mark_redirect_target(&mut self, url: &str) {
        if !self.visited.contains(url) {
            self.redirected.insert(url.to_string());
        }
    }

    /// The links whose URLs have not been visited, in their original order.
    pub fn unvisited_links(&self, links: &[UrlCandidate]) -> Vec<UrlCandidate> {
        links
            .iter()
            .filter(|link| !self.is_visited(&link.url))
            .cloned()
            .collect()
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Visited URLs in the order they were handed out.
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
