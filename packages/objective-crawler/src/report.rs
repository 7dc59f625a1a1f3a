//! Crawl results and the persisted report document.

use serde::{Deserialize, Serialize};

use crate::types::{
    config::RelevanceThresholds,
    extraction::{KeyContent, SiteStrategy},
    objective::{CrawlObjective, ObjectiveAnalysis},
    page::VisitedPage,
    site_model::SiteModel,
};

/// Lower bound of the "high" relevance bucket.
const HIGH_BUCKET: f32 = 7.0;
/// Lower bound of the "moderate" relevance bucket.
const MODERATE_BUCKET: f32 = 4.0;

/// Everything a finished crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub objective: CrawlObjective,

    /// Visited log: successful pages in the order they were recorded
    pub pages: Vec<VisitedPage>,

    pub site_model: SiteModel,

    /// Strategy chosen after reconnaissance
    pub strategy: SiteStrategy,

    /// URLs dequeued over the whole crawl, failures included
    pub urls_visited: usize,

    /// URLs dequeued during reconnaissance
    pub urls_visited_in_recon: usize,

    pub thresholds: RelevanceThresholds,
}

/// Page counts per relevance bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceBuckets {
    #[serde(rename = "high (7-10)")]
    pub high: usize,
    #[serde(rename = "moderate (4-6)")]
    pub moderate: usize,
    #[serde(rename = "low (0-3)")]
    pub low: usize,
}

/// One page in the persisted report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub url: String,
    pub page_type: String,
    pub relevance: f32,
    pub extracted_content: KeyContent,
}

/// The JSON document written at the end of a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub objective: String,
    pub total_pages_crawled: usize,
    pub high_value_pages: usize,
    pub pages_by_relevance: RelevanceBuckets,
    pub extracted_data: Vec<ReportEntry>,
}

impl CrawlReport {
    pub fn analysis(&self) -> &ObjectiveAnalysis {
        &self.objective.analysis
    }

    /// Pages in the visited log at or above the high-value threshold.
    pub fn high_value_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.relevance_score >= self.thresholds.high_value)
            .count()
    }

    /// Mean relevance of Oracle-scored pages, 0 when none were scored.
    pub fn average_relevance(&self) -> f32 {
        self.site_model.average_relevance()
    }

    pub fn relevance_buckets(&self) -> RelevanceBuckets {
        let mut buckets = RelevanceBuckets::default();
        for page in &self.pages {
            match page.relevance_score {
                score if score >= HIGH_BUCKET => buckets.high += 1,
                score if score >= MODERATE_BUCKET => buckets.moderate += 1,
                _ => buckets.low += 1,
            }
        }
        buckets
    }

    /// Pages worth reporting, in visited-log order.
    pub fn reportable_pages(&self) -> impl Iterator<Item = &VisitedPage> {
        self.pages
            .iter()
            .filter(|page| page.relevance_score >= self.thresholds.report)
    }

    pub fn to_document(&self) -> ReportDocument {
        ReportDocument {
            objective: self.objective.text.clone(),
            total_pages_crawled: self.pages.len(),
            high_value_pages: self.high_value_pages(),
            pages_by_relevance: self.relevance_buckets(),
            extracted_data: self
                .reportable_pages()
                .map(|page| ReportEntry {
                    url: page.url.clone(),
                    page_type: page.page_type.clone(),
                    relevance: page.relevance_score,
                    extracted_content: page.extracted_content.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        extraction::{ExtractionMethod, ExtractionResult},
        page::FetchedPage,
    };

    fn page(url: &str, relevance: f32) -> VisitedPage {
        let fetched = FetchedPage::new(url, "<html></html>");
        let mut key_content = KeyContent::new();
        key_content.insert("note".to_string(), serde_json::json!(url));
        VisitedPage::from_extraction(
            &fetched,
            ExtractionResult {
                page_type: "article".to_string(),
                relevance_score: relevance,
                key_content,
                reasoning: String::new(),
                content_summary: String::new(),
                sections: Vec::new(),
                method: ExtractionMethod::WholePage,
            },
        )
    }

    fn report(scores: &[f32]) -> CrawlReport {
        CrawlReport {
            objective: CrawlObjective::new("rate limits", ObjectiveAnalysis::default()),
            pages: scores
                .iter()
                .enumerate()
                .map(|(i, score)| page(&format!("https://e.com/{i}"), *score))
                .collect(),
            site_model: SiteModel::new(),
            strategy: SiteStrategy {
                site_type: "docs".to_string(),
                valuable_page_types: Vec::new(),
                recommended_focus: String::new(),
                high_priority_patterns: Vec::new(),
                strategy: Default::default(),
            },
            urls_visited: scores.len(),
            urls_visited_in_recon: 0,
            thresholds: RelevanceThresholds::default(),
        }
    }

    #[test]
    fn test_buckets_partition_pages() {
        let buckets = report(&[9.0, 7.0, 6.5, 4.0, 3.9, 0.0]).relevance_buckets();
        assert_eq!(
            buckets,
            RelevanceBuckets {
                high: 2,
                moderate: 2,
                low: 2
            }
        );
    }

    #[test]
    fn test_document_filters_by_report_threshold() {
        let document = report(&[8.0, 3.0, 4.0, 6.0]).to_document();

        assert_eq!(document.total_pages_crawled, 4);
        assert_eq!(document.high_value_pages, 2);
        let urls: Vec<&str> = document
            .extracted_data
            .iter()
            .map(|entry| entry.url.as_str())
            .collect();
        assert_eq!(urls, vec!["https://e.com/0", "https://e.com/2", "https://e.com/3"]);
    }

    #[test]
    fn test_json_uses_bucket_labels() {
        let json = report(&[8.0]).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["objective"], "rate limits");
        assert_eq!(value["pages_by_relevance"]["high (7-10)"], 1);
        assert_eq!(value["extracted_data"][0]["extracted_content"]["note"], "https://e.com/0");
    }
}
