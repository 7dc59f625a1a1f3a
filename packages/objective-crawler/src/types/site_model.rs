//! Site model: what the crawl has learned about the site so far.
//!
//! Owned by the controller and mutated only between batches. Tasks that need
//! it borrow it immutably while a batch is in flight.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::extraction::{SiteStrategy, StrategyKind};
use super::link::url_pattern;

/// Similar URLs consulted when computing a historical average.
const HISTORY_SAMPLE: usize = 3;

/// Historical average used when no similar URL has been visited.
const NEUTRAL_RELEVANCE: f32 = 5.0;

/// A high-value page recorded under its page type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternObservation {
    pub url: String,
    pub pattern: String,
    pub relevance: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteModel {
    /// Set by structure analysis
    pub site_type: Option<String>,

    /// Page types structure analysis found most valuable
    pub main_sections: Vec<String>,

    /// High-value pages bucketed by page type
    pub content_patterns: IndexMap<String, Vec<PatternObservation>>,

    /// Patterns of pages that scored at or above the high-value threshold.
    /// Only ever grows.
    pub high_value_patterns: IndexSet<String>,

    /// Patterns recommended by structure analysis
    pub high_priority_patterns: IndexSet<String>,

    pub recommended_focus: String,

    /// Strategy chosen by structure analysis
    pub strategy: Option<StrategyKind>,

    /// Relevance of every Oracle-scored page, in visit order
    pub relevance_by_url: IndexMap<String, f32>,

    /// URLs that scored at or above the high-value threshold
    pub high_value_pages: IndexSet<String>,

    /// Every URL handed out for fetching, in order, failures included
    pub visited_urls: IndexSet<String>,
}

impl SiteModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scored page.
    ///
    /// Pages at or above `high_value_threshold` register their URL pattern and
    /// land in the bucket for their page type.
    pub fn record(&mut self, url: &str, page_type: &str, relevance: f32, high_value_threshold: f32) {
        self.note_visit(url);
        self.relevance_by_url.insert(url.to_string(), relevance);

        if relevance < high_value_threshold {
            return;
        }

        let pattern = url_pattern(url);
        self.high_value_pages.insert(url.to_string());
        self.high_value_patterns.insert(pattern.clone());
        self.content_patterns
            .entry(page_type.to_string())
            .or_default()
            .push(PatternObservation {
                url: url.to_string(),
                pattern,
                relevance,
            });
    }

    /// Remember a visited URL whether or not it ends up scored.
    pub fn note_visit(&mut self, url: &str) {
        if !self.visited_urls.contains(url) {
            self.visited_urls.insert(url.to_string());
        }
    }

    /// Fold structure-analysis guidance into the model.
    ///
    /// Priority patterns are unioned; everything else is replaced.
    pub fn merge_strategy(&mut self, strategy: &SiteStrategy) {
        self.site_type = Some(strategy.site_type.clone());
        self.main_sections = strategy.valuable_page_types.clone();
        self.recommended_focus = strategy.recommended_focus.clone();
        self.strategy = Some(strategy.strategy);
        self.high_priority_patterns
            .extend(strategy.high_priority_patterns.iter().cloned());
    }

    /// Whether a pattern has been learned or recommended as valuable.
    pub fn is_valuable_pattern(&self, pattern: &str) -> bool {
        self.high_value_patterns.contains(pattern) || self.high_priority_patterns.contains(pattern)
    }

    /// Mean relevance of the first three visited URLs sharing `url`'s
    /// pattern. Visited URLs without an Oracle score count as 0.
    pub fn historical_average(&self, url: &str) -> f32 {
        let pattern = url_pattern(url);
        let similar: Vec<f32> = self
            .visited_urls
            .iter()
            .filter(|seen| url_pattern(seen) == pattern)
            .take(HISTORY_SAMPLE)
            .map(|seen| self.relevance_by_url.get(seen).copied().unwrap_or(0.0))
            .collect();

        if similar.is_empty() {
            NEUTRAL_RELEVANCE
        } else {
            similar.iter().sum::<f32>() / similar.len() as f32
        }
    }

    /// Mean relevance over every scored page, 0 when nothing was scored.
    pub fn average_relevance(&self) -> f32 {
        if self.relevance_by_url.is_empty() {
            return 0.0;
        }
        self.relevance_by_url.values().sum::<f32>() / self.relevance_by_url.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_below_threshold_only_tracks_relevance() {
        let mut model = SiteModel::new();
        model.record("https://example.com/about", "about", 5.5, 6.0);

        assert_eq!(model.relevance_by_url.get("https://example.com/about"), Some(&5.5));
        assert!(model.high_value_patterns.is_empty());
        assert!(model.content_patterns.is_empty());
    }

    #[test]
    fn test_record_high_value_learns_pattern_once() {
        let mut model = SiteModel::new();
        model.record("https://example.com/docs/1", "docs", 8.0, 6.0);
        model.record("https://example.com/docs/2", "docs", 7.0, 6.0);

        assert_eq!(model.high_value_patterns.len(), 1);
        assert!(model.high_value_patterns.contains("/docs/*"));
        assert_eq!(model.content_patterns["docs"].len(), 2);
        assert_eq!(model.high_value_pages.len(), 2);
    }

    #[test]
    fn test_historical_average() {
        let mut model = SiteModel::new();
        assert_eq!(model.historical_average("https://example.com/blog/9"), 5.0);

        model.record("https://example.com/blog/1", "post", 8.0, 6.0);
        model.record("https://example.com/blog/2", "post", 4.0, 6.0);
        model.record("https://example.com/blog/3", "post", 6.0, 6.0);
        model.record("https://example.com/blog/4", "post", 0.0, 6.0);
        model.record("https://example.com/other", "misc", 1.0, 6.0);

        assert_eq!(model.historical_average("https://example.com/blog/9"), 6.0);
    }

    #[test]
    fn test_unscored_visits_pull_history_down() {
        let mut model = SiteModel::new();
        model.note_visit("https://example.com/blog/1");
        model.record("https://example.com/blog/2", "post", 9.0, 6.0);
        model.note_visit("https://example.com/blog/2");

        assert_eq!(model.visited_urls.len(), 2);
        assert_eq!(model.historical_average("https://example.com/blog/9"), 4.5);
        assert_eq!(model.average_relevance(), 9.0);
    }

    #[test]
    fn test_merge_strategy_unions_patterns() {
        let mut model = SiteModel::new();
        model.high_priority_patterns.insert("/docs/*".to_string());

        model.merge_strategy(&SiteStrategy {
            site_type: "documentation".to_string(),
            valuable_page_types: vec!["reference".to_string()],
            recommended_focus: "API reference".to_string(),
            high_priority_patterns: vec!["/api/*".to_string(), "/docs/*".to_string()],
            strategy: StrategyKind::ContinueDeep,
        });

        assert_eq!(model.site_type.as_deref(), Some("documentation"));
        assert_eq!(model.high_priority_patterns.len(), 2);
        assert!(model.is_valuable_pattern("/api/*"));
        assert_eq!(model.main_sections, vec!["reference"]);
    }
}
