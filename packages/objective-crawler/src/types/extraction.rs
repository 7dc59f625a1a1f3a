//! Results of page extraction and structure analysis.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key/value document extracted from a page, in insertion order.
pub type KeyContent = IndexMap<String, Value>;

/// Which path produced an [`ExtractionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Per-section Oracle scoring
    Sections,
    /// Single Oracle call over the whole page
    WholePage,
    /// Last-resort extraction without the Oracle
    Fallback,
}

impl ExtractionMethod {
    /// Whether the Oracle judged this page. Only such results teach the site model.
    pub fn is_oracle_derived(&self) -> bool {
        !matches!(self, ExtractionMethod::Fallback)
    }
}

/// The Oracle's verdict on one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAnalysis {
    pub section_id: usize,
    pub relevance_score: f32,
    pub reason: String,

    /// Only meaningful when the section scored at or above the keep threshold
    pub extracted_content: Option<Value>,
}

/// What extraction produced for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub page_type: String,

    /// In [0, 10]; the maximum section score for section extraction
    pub relevance_score: f32,

    pub key_content: KeyContent,
    pub reasoning: String,
    pub content_summary: String,

    /// Per-section verdicts, empty unless `method` is `Sections`
    #[serde(default)]
    pub sections: Vec<SectionAnalysis>,

    pub method: ExtractionMethod,
}

/// What the crawl should do after reconnaissance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    ContinueDeep,
    AdjustObjective,
    SiteNotSuitable,
}

impl StrategyKind {
    /// Parse the Oracle's label. Unknown labels mean `ContinueDeep`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "adjust_objective" => StrategyKind::AdjustObjective,
            "site_not_suitable" => StrategyKind::SiteNotSuitable,
            _ => StrategyKind::ContinueDeep,
        }
    }
}

/// Strategic guidance produced once, between reconnaissance and deep crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStrategy {
    pub site_type: String,
    pub valuable_page_types: Vec<String>,
    pub recommended_focus: String,
    pub high_priority_patterns: Vec<String>,
    pub strategy: StrategyKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_labels() {
        assert_eq!(
            StrategyKind::from_label("site_not_suitable"),
            StrategyKind::SiteNotSuitable
        );
        assert_eq!(
            StrategyKind::from_label(" Adjust_Objective "),
            StrategyKind::AdjustObjective
        );
        assert_eq!(
            StrategyKind::from_label("continue_deep | adjust_objective"),
            StrategyKind::ContinueDeep
        );
    }

    #[test]
    fn test_fallback_is_not_oracle_derived() {
        assert!(ExtractionMethod::Sections.is_oracle_derived());
        assert!(ExtractionMethod::WholePage.is_oracle_derived());
        assert!(!ExtractionMethod::Fallback.is_oracle_derived());
    }
}
