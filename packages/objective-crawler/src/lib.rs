//! Objective-Driven Site Crawler
//!
//! Crawls a single website in pursuit of a free-text objective ("find every
//! API rate limit", "collect board member bios") and returns the pages that
//! matter, with structured content extracted from each.
//!
//! # Design Philosophy
//!
//! **Cheap heuristics first, the LLM for the hard calls**
//!
//! - Deterministic link scoring narrows every decision before the LLM sees it
//! - The LLM (the "Oracle") is advisory: every call has a fallback
//! - A short reconnaissance pass learns the site before the budget is spent
//! - One host, one budget, nothing visited twice
//!
//! # Usage
//!
//! ```rust,ignore
//! use objective_crawler::{CrawlConfig, ObjectiveCrawler};
//! use objective_crawler::fetchers::HttpFetcher;
//! use objective_crawler::oracle::OllamaOracle;
//!
//! let config = CrawlConfig::new("https://docs.example.com", "API rate limits")
//!     .with_max_pages(40)
//!     .with_concurrency(4);
//!
//! let crawler = ObjectiveCrawler::new(HttpFetcher::new()?, OllamaOracle::from_env(), config);
//! let report = crawler.run().await?;
//! println!("{}", report.to_json()?);
//! ```
//!
//! # Modules
//!
//! - [`controller`] - Phase controller (reconnaissance, structure analysis, deep crawl)
//! - [`frontier`] - Scoped URL queue with the visited set
//! - [`scoring`] - Heuristic link scoring and pre-filtering
//! - [`oracle`] - Prompts, reply parsing and LLM backends
//! - [`extraction`] - Section-aware and whole-page content extraction
//! - [`html`] - Link, section and metadata extraction from HTML
//! - [`fetchers`] - Page fetcher implementations
//! - [`report`] - Crawl results and the persisted report
//! - [`testing`] - Mock implementations for testing

pub mod controller;
pub mod error;
pub mod extraction;
pub mod fetchers;
pub mod frontier;
pub mod html;
pub mod oracle;
pub mod report;
pub mod scoring;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use controller::{ObjectiveCrawler, Phase};
pub use error::{ConfigError, FetchError, OracleError};
pub use extraction::ExtractionCoordinator;
pub use frontier::Frontier;
pub use oracle::{OracleAdapter, OracleOutcome};
pub use report::{CrawlReport, RelevanceBuckets, ReportDocument, ReportEntry};
pub use traits::{fetcher::PageFetcher, oracle::Oracle};
pub use types::{
    config::{CrawlConfig, ExtractionPolicy, NavigationPolicy, RelevanceThresholds},
    extraction::{ExtractionMethod, ExtractionResult, KeyContent, SiteStrategy, StrategyKind},
    link::{Priority, ScoredLink, UrlCandidate},
    objective::{CrawlObjective, ObjectiveAnalysis},
    page::{FetchedPage, PageSection, VisitedPage},
    site_model::SiteModel,
};
