//! Configuration types for a crawl.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Objective used when the operator supplies none.
pub const DEFAULT_OBJECTIVE: &str = "Extract all relevant content and structured data";

/// Model used for both decision and extraction calls unless overridden.
pub const DEFAULT_MODEL: &str = "deepseek-r1:14b";

/// Upper bound on concurrent fetch+extract tasks per batch.
pub const MAX_CONCURRENCY: usize = 10;

/// How next hops are chosen during the deep crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// Pre-filtered candidates ranked by heuristic score only.
    Heuristic,
    /// Pre-filtered candidates handed to the Oracle for selection.
    #[default]
    AiGuided,
}

/// How a fetched page is turned into an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// One Oracle call over the whole page.
    WholePage,
    /// Score sections independently when the page has at least two.
    #[default]
    SectionAware,
}

/// Relevance cut-offs used at different points of the crawl.
///
/// The values differ on purpose and are kept independent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceThresholds {
    /// Recon pages at or above this seed the deep crawl; also the
    /// `should_crawl` cut-off for heuristic navigation.
    pub crawl: f32,

    /// Pages at or above this feed pattern learning in the site model.
    pub high_value: f32,

    /// Pages at or above this are included in the persisted report.
    pub report: f32,

    /// Sections at or above this contribute extraction blocks.
    pub section_keep: f32,
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            crawl: 5.0,
            high_value: 6.0,
            report: 4.0,
            section_keep: 4.0,
        }
    }
}

/// Configuration for one objective-driven crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Free-text description of what the operator is after
    pub objective: String,

    /// Where the crawl starts; its host scopes the whole crawl
    pub start_url: String,

    /// Hard cap on visited URLs, failures included
    pub max_pages: usize,

    /// Fetch+extract tasks launched per reconnaissance batch
    pub concurrency: usize,

    /// Model for objective analysis, navigation and structure analysis
    pub decision_model: String,

    /// Model for page and section extraction
    pub extraction_model: String,

    /// Share of `max_pages` spent on reconnaissance
    pub recon_fraction: f64,

    /// Minimum reconnaissance budget
    pub recon_floor: usize,

    /// Relevance cut-offs
    #[serde(default)]
    pub thresholds: RelevanceThresholds,

    /// Deadline applied to every Oracle call
    #[serde(with = "duration_secs")]
    pub oracle_timeout: Duration,

    /// Deep-crawl navigation policy
    #[serde(default)]
    pub navigation: NavigationPolicy,

    /// Page extraction policy
    #[serde(default)]
    pub extraction: ExtractionPolicy,

    /// Links taken per page during reconnaissance
    pub recon_links_per_page: usize,

    /// Links taken per recon page when seeding the deep crawl
    pub seed_links_per_page: usize,

    /// Links the navigator may pick per page
    pub max_links_to_select: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            objective: DEFAULT_OBJECTIVE.to_string(),
            start_url: String::new(),
            max_pages: 50,
            concurrency: 3,
            decision_model: DEFAULT_MODEL.to_string(),
            extraction_model: DEFAULT_MODEL.to_string(),
            recon_fraction: 0.1,
            recon_floor: 5,
            thresholds: RelevanceThresholds::default(),
            oracle_timeout: Duration::from_secs(60),
            navigation: NavigationPolicy::default(),
            extraction: ExtractionPolicy::default(),
            recon_links_per_page: 8,
            seed_links_per_page: 7,
            max_links_to_select: 5,
        }
    }
}

impl CrawlConfig {
    /// Create a config for a start URL and objective.
    ///
    /// A blank objective is replaced by [`DEFAULT_OBJECTIVE`].
    pub fn new(start_url: impl Into<String>, objective: impl Into<String>) -> Self {
        let objective = objective.into();
        let objective = if objective.trim().is_empty() {
            DEFAULT_OBJECTIVE.to_string()
        } else {
            objective.trim().to_string()
        };

        Self {
            start_url: start_url.into(),
            objective,
            ..Default::default()
        }
    }

    /// Set maximum pages.
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Set per-batch concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the decision model.
    pub fn with_decision_model(mut self, model: impl Into<String>) -> Self {
        self.decision_model = model.into();
        self
    }

    /// Set the extraction model.
    pub fn with_extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = model.into();
        self
    }

    /// Set the reconnaissance fraction.
    pub fn with_recon_fraction(mut self, fraction: f64) -> Self {
        self.recon_fraction = fraction;
        self
    }

    /// Set relevance thresholds.
    pub fn with_thresholds(mut self, thresholds: RelevanceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the per-call Oracle timeout.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Set the navigation policy.
    pub fn with_navigation(mut self, policy: NavigationPolicy) -> Self {
        self.navigation = policy;
        self
    }

    /// Set the extraction policy.
    pub fn with_extraction(mut self, policy: ExtractionPolicy) -> Self {
        self.extraction = policy;
        self
    }

    /// Pages spent on reconnaissance: `max(floor, ⌊max_pages·fraction⌋)`,
    /// never more than `max_pages`.
    pub fn recon_budget(&self) -> usize {
        let share = (self.max_pages as f64 * self.recon_fraction).floor() as usize;
        share.max(self.recon_floor).min(self.max_pages)
    }

    /// Pages fetched per deep-crawl batch.
    pub fn deep_batch_size(&self) -> usize {
        (self.concurrency / 2).max(2)
    }

    /// Check the config and return the parsed start URL.
    pub fn validate(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.start_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.start_url.clone(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::MissingHost(self.start_url.clone()));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroMaxPages);
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyOutOfRange(self.concurrency));
        }
        if !(self.recon_fraction > 0.0 && self.recon_fraction <= 1.0) {
            return Err(ConfigError::InvalidReconFraction(self.recon_fraction));
        }

        Ok(url)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
