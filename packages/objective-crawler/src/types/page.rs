//! Page types: what a fetcher returns, what the crawl records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::extraction::{ExtractionMethod, ExtractionResult, KeyContent};

/// A successfully fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// Raw HTML
    pub html: String,

    /// Markdown rendering, empty when the fetcher produced none
    #[serde(default)]
    pub markdown: String,

    pub title: Option<String>,
    pub description: Option<String>,

    /// Number of anchors on the page
    pub link_count: usize,

    pub status_code: u16,
}

impl FetchedPage {
    /// A page with HTML only, for fetchers that skip metadata.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            html: html.into(),
            markdown: String::new(),
            title: None,
            description: None,
            link_count: 0,
            status_code: 200,
        }
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = markdown.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// One entry of the append-only visited log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitedPage {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub page_type: String,

    /// Page relevance in [0, 10]
    pub relevance_score: f32,

    /// Opaque extracted document
    pub extracted_content: KeyContent,

    pub content_summary: String,

    /// Which extraction path produced this record
    pub method: ExtractionMethod,

    /// Sections scored, zero for whole-page extraction
    pub sections_analyzed: usize,

    pub visited_at: DateTime<Utc>,
}

impl VisitedPage {
    pub fn from_extraction(page: &FetchedPage, extraction: ExtractionResult) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            description: page.description.clone(),
            page_type: extraction.page_type,
            relevance_score: extraction.relevance_score,
            extracted_content: extraction.key_content,
            content_summary: extraction.content_summary,
            method: extraction.method,
            sections_analyzed: extraction.sections.len(),
            visited_at: Utc::now(),
        }
    }
}

/// A structurally distinct content block on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSection {
    /// Position among the page's sections, starting at 0
    pub id: usize,

    /// `id` attribute, class list, or a generated name (at most 50 chars)
    pub name: String,

    /// First three non-empty `h1`..`h4` texts
    pub headers: Vec<String>,

    /// First 400 characters of visible text
    pub text_preview: String,

    pub word_count: usize,

    /// Element name the section was found on
    pub tag_kind: String,
}
