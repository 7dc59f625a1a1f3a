//! The crawl objective and its derived analysis.

use serde::{Deserialize, Serialize};

/// What the operator wants, plus what the Oracle made of it.
///
/// Built once at the start of a crawl and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlObjective {
    /// Original free text
    pub text: String,

    /// Derived analysis (either the Oracle's or the fixed default)
    pub analysis: ObjectiveAnalysis,
}

impl CrawlObjective {
    pub fn new(text: impl Into<String>, analysis: ObjectiveAnalysis) -> Self {
        Self {
            text: text.into(),
            analysis,
        }
    }

    /// Lowercased objective tokens longer than three characters.
    pub fn keywords(&self) -> Vec<String> {
        self.text
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .map(str::to_string)
            .collect()
    }
}

/// Structured reading of an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveAnalysis {
    /// Kinds of data the operator is after
    pub data_types: Vec<String>,

    /// Fields worth capturing on a page
    pub key_fields: Vec<String>,

    /// Parts of a page likely to hold the data
    pub valuable_sections: Vec<String>,

    /// URL fragments that suggest a relevant page
    pub seek_patterns: Vec<String>,

    /// URL fragments that suggest an irrelevant page
    pub avoid_patterns: Vec<String>,

    /// Free-text extraction strategy
    pub strategy: String,

    /// Free-text success criteria
    pub success_criteria: String,
}

impl Default for ObjectiveAnalysis {
    fn default() -> Self {
        Self {
            data_types: vec!["general content".to_string()],
            key_fields: vec![
                "title".to_string(),
                "content".to_string(),
                "links".to_string(),
            ],
            valuable_sections: vec!["main content".to_string()],
            seek_patterns: Vec::new(),
            avoid_patterns: vec![
                "login".to_string(),
                "signup".to_string(),
                "cart".to_string(),
            ],
            strategy: "Extract all available content".to_string(),
            success_criteria: "Crawl specified number of pages".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_skip_short_words() {
        let objective = CrawlObjective::new(
            "Find the API docs for Rate Limits",
            ObjectiveAnalysis::default(),
        );
        assert_eq!(objective.keywords(), vec!["find", "docs", "rate", "limits"]);
    }

    #[test]
    fn test_default_analysis_avoids_auth_pages() {
        let analysis = ObjectiveAnalysis::default();
        assert_eq!(analysis.data_types, vec!["general content"]);
        assert_eq!(analysis.avoid_patterns, vec!["login", "signup", "cart"]);
        assert!(analysis.seek_patterns.is_empty());
    }
}
