//! Link candidates discovered on a page and their scored form.

use serde::{Deserialize, Serialize};
use url::Url;

/// Path segments longer than this collapse to `*` in a URL pattern.
const MAX_LITERAL_SEGMENT: usize = 30;

/// A link found on a fetched page, with the context it appeared in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCandidate {
    /// Normalized absolute URL (`scheme://host[:port]/path`)
    pub url: String,

    /// Visible anchor text
    pub anchor_text: String,

    /// Text of the anchor's parent element, truncated
    pub context: String,

    /// `title` attribute, if any
    pub title: Option<String>,

    /// `aria-label` attribute, if any
    pub aria_label: Option<String>,

    /// Inside `nav` or `header`
    pub in_nav: bool,

    /// Inside `main`
    pub in_main: bool,

    /// Inside an `h1`..`h3` heading
    pub is_prominent: bool,
}

impl UrlCandidate {
    /// Bare candidate with no context, as used for seeds.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor_text: String::new(),
            context: String::new(),
            title: None,
            aria_label: None,
            in_nav: false,
            in_main: false,
            is_prominent: false,
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor_text = anchor.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn in_nav(mut self) -> Self {
        self.in_nav = true;
        self
    }

    pub fn in_main(mut self) -> Self {
        self.in_main = true;
        self
    }

    pub fn prominent(mut self) -> Self {
        self.is_prominent = true;
        self
    }

    /// Path component of the URL, empty when the URL does not parse.
    pub fn url_path(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }

    /// Generalized shape of this candidate's URL.
    pub fn pattern(&self) -> String {
        url_pattern(&self.url)
    }
}

/// Generalize a URL's path into a pattern.
///
/// Purely numeric segments and segments longer than 30 characters become
/// `*`; everything else is kept literally. `/blog/2024/some-post` becomes
/// `/blog/*/some-post`. Unparseable input yields `/`.
pub fn url_pattern(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => return "/".to_string(),
    };

    let parts: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let numeric = segment.chars().all(|c| c.is_ascii_digit());
            if numeric || segment.chars().count() > MAX_LITERAL_SEGMENT {
                "*"
            } else {
                segment
            }
        })
        .collect();

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Priority tier derived from a heuristic score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// `High` at 8 or more, `Medium` at 6 or more, otherwise `Low`.
    pub fn from_score(score: f32) -> Self {
        if score >= 8.0 {
            Priority::High
        } else if score >= 6.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// A candidate after deep-crawl pre-scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLink {
    pub candidate: UrlCandidate,

    /// Heuristic score in [0, 10]
    pub score: f32,

    /// Mean relevance of visited URLs sharing this pattern (5 when none)
    pub historical_average: f32,

    pub priority: Priority,
}

impl ScoredLink {
    pub fn url(&self) -> &str {
        &self.candidate.url
    }
}
