//! HTML primitives built on `scraper`.
//!
//! [`PageDigest::parse`] turns raw HTML into owned data in one synchronous
//! pass, so nothing borrowed from the DOM lives across an await point.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::types::{link::UrlCandidate, page::PageSection};

/// Elements whose text never counts as page content.
const NOISE_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

/// Substrings that disqualify an href regardless of the objective.
const STATIC_AVOID_PATTERNS: &[&str] = &[
    "javascript:",
    "mailto:",
    "tel:",
    "#",
    ".jpg",
    ".png",
    ".pdf",
    ".css",
    ".js",
];

pub const MAX_SECTIONS: usize = 8;
const SECTION_NAME_LIMIT: usize = 50;
const SECTION_PREVIEW_LIMIT: usize = 400;
const SECTION_HEADER_LIMIT: usize = 3;
const SEMANTIC_MIN_TEXT: usize = 50;
const BLOCK_MIN_TEXT: usize = 100;
const CONTEXT_LIMIT: usize = 200;
const PAGE_HEADER_LIMIT: usize = 15;

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn is_noise(element: &ElementRef) -> bool {
    NOISE_TAGS.contains(&element.value().name())
}

/// Whether any ancestor is one of `tags`.
fn within(element: &ElementRef, tags: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| tags.contains(&ancestor.value().name()))
}

/// Visible text under `element`, noise excluded, trimmed fragments joined
/// with `separator`.
fn visible_text(element: ElementRef, separator: &str) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_noise = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_noise(&ancestor));
        if inside_noise {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(separator)
}

/// Non-empty heading texts under `element` for the given selector.
fn heading_texts(element: ElementRef, headings: &Selector) -> Vec<String> {
    element
        .select(headings)
        .filter(|heading| !within(heading, NOISE_TAGS))
        .map(|heading| visible_text(heading, " "))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Resolve `href` against `base` and drop query and fragment.
pub fn normalize_url(href: &str, base: &Url) -> Option<String> {
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

fn same_host(url: &str, scope: &Url) -> bool {
    Url::parse(url)
        .map(|u| u.host_str() == scope.host_str() && u.port() == scope.port())
        .unwrap_or(false)
}

/// Everything the crawl needs from one page's HTML.
#[derive(Debug, Clone, Default)]
pub struct PageDigest {
    pub title: Option<String>,

    /// Visible text, one fragment per line
    pub text: String,

    /// First 15 `h1`..`h3` texts
    pub headers: Vec<String>,

    pub sections: Vec<PageSection>,

    /// Same-host links with context, in document order, de-duplicated
    pub links: Vec<UrlCandidate>,
}

impl PageDigest {
    /// Parse `html` fetched from `page_url`.
    ///
    /// Links are resolved against `page_url`, kept only when they share
    /// `scope`'s host and port, and dropped when the href contains any of
    /// `avoid_patterns` (case-insensitive).
    pub fn parse(html: &str, page_url: &Url, scope: &Url, avoid_patterns: &[String]) -> Self {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let headers = selector("h1, h2, h3")
            .map(|s| heading_texts(root, &s))
            .unwrap_or_default()
            .into_iter()
            .take(PAGE_HEADER_LIMIT)
            .collect();

        Self {
            title: extract_title(&document),
            text: visible_text(root, "\n"),
            headers,
            sections: identify_sections(&document),
            links: extract_links(&document, page_url, scope, avoid_patterns),
        }
    }
}

/// Text of the `<title>` element.
pub fn extract_title(document: &Html) -> Option<String> {
    let title = selector("title")?;
    document
        .select(&title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Content of `<meta name="description">`.
pub fn extract_description(document: &Html) -> Option<String> {
    let meta = selector(r#"meta[name="description"]"#)?;
    document
        .select(&meta)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Number of anchors carrying an href.
pub fn count_links(document: &Html) -> usize {
    selector("a[href]")
        .map(|s| document.select(&s).count())
        .unwrap_or(0)
}

/// Links with their surrounding context.
pub fn extract_links(
    document: &Html,
    page_url: &Url,
    scope: &Url,
    avoid_patterns: &[String],
) -> Vec<UrlCandidate> {
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };

    let avoid: Vec<String> = avoid_patterns
        .iter()
        .map(|p| p.to_lowercase())
        .chain(STATIC_AVOID_PATTERNS.iter().map(|p| p.to_string()))
        .filter(|p| !p.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href_lower = href.to_lowercase();
        if avoid.iter().any(|p| href_lower.contains(p.as_str())) {
            continue;
        }

        let Some(url) = normalize_url(href, page_url) else {
            continue;
        };
        if !same_host(&url, scope) {
            continue;
        }

        let anchor_text = anchor
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if anchor_text.chars().count() < 2 {
            continue;
        }
        if !seen.insert(url.clone()) {
            continue;
        }

        let context = anchor
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| {
                let text = parent
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                truncate_chars(&text, CONTEXT_LIMIT)
            })
            .unwrap_or_default();

        let attr = |name: &str| {
            anchor
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        links.push(UrlCandidate {
            url,
            anchor_text,
            context,
            title: attr("title"),
            aria_label: attr("aria-label"),
            in_nav: within(&anchor, &["nav", "header"]),
            in_main: within(&anchor, &["main"]),
            is_prominent: within(&anchor, &["h1", "h2", "h3"]),
        });
    }

    links
}

fn section_from(element: ElementRef, id: usize, name: String, text: &str) -> PageSection {
    let headers = selector("h1, h2, h3, h4")
        .map(|s| heading_texts(element, &s))
        .unwrap_or_default()
        .into_iter()
        .take(SECTION_HEADER_LIMIT)
        .collect();

    PageSection {
        id,
        name: truncate_chars(&name, SECTION_NAME_LIMIT),
        headers,
        text_preview: truncate_chars(text, SECTION_PREVIEW_LIMIT),
        word_count: text.split_whitespace().count(),
        tag_kind: element.value().name().to_string(),
    }
}

fn class_list(element: &ElementRef) -> String {
    element
        .value()
        .attr("class")
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Structurally distinct content blocks, at most eight.
///
/// Semantic blocks (`section`, `article`, `main`) with at least 50 characters
/// of text come first. When fewer than two qualify, `div`s carrying a class
/// and at least 100 characters are used instead, skipping any nested inside
/// one already taken.
pub fn identify_sections(document: &Html) -> Vec<PageSection> {
    let mut sections = Vec::new();

    if let Some(semantic) = selector("section, article, main") {
        for element in document.select(&semantic) {
            if within(&element, NOISE_TAGS) {
                continue;
            }
            let text = visible_text(element, " ");
            if text.chars().count() < SEMANTIC_MIN_TEXT {
                continue;
            }

            let id = sections.len();
            let name = element
                .value()
                .id()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| Some(class_list(&element)).filter(|c| !c.is_empty()))
                .unwrap_or_else(|| format!("section_{id}"));
            sections.push(section_from(element, id, name, &text));
        }
    }

    if sections.len() >= 2 {
        sections.truncate(MAX_SECTIONS);
        return sections;
    }

    sections.clear();
    let Some(blocks) = selector("div[class]") else {
        return sections;
    };

    let mut captured = Vec::new();
    for element in document.select(&blocks) {
        if sections.len() >= MAX_SECTIONS {
            break;
        }
        if within(&element, NOISE_TAGS) {
            continue;
        }
        if element.ancestors().any(|a| captured.contains(&a.id())) {
            continue;
        }
        let text = visible_text(element, " ");
        if text.chars().count() < BLOCK_MIN_TEXT {
            continue;
        }

        let id = sections.len();
        let classes = class_list(&element);
        let name = if classes.is_empty() {
            format!("content_block_{id}")
        } else {
            classes
        };
        captured.push(element.id());
        sections.push(section_from(element, id, name, &text));
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    const LONG: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_normalize_url_drops_query_and_fragment() {
        let base = url("https://example.com/docs/");
        assert_eq!(
            normalize_url("guide?x=1", &base).as_deref(),
            Some("https://example.com/docs/guide")
        );
        assert_eq!(
            normalize_url("/about", &base).as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(normalize_url("ftp://example.com/x", &base), None);
    }

    #[test]
    fn test_extract_links_with_context_and_flags() {
        let html = r#"
            <html><body>
              <header><nav><a href="/home">Home</a></nav></header>
              <main>
                <h2><a href="/pricing" title="Plans">Pricing</a></h2>
                <p>Read the <a href="/docs/start">getting started guide</a> first.</p>
                <a href="/docs/start">Duplicate</a>
                <a href="/x">X</a>
                <a href="mailto:hi@example.com">Mail us</a>
                <a href="/brochure.pdf">Brochure</a>
                <a href="/login">Sign in</a>
                <a href="https://other.org/page">Elsewhere</a>
              </main>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let base = url("https://example.com/");
        let links = extract_links(&document, &base, &base, &["login".to_string()]);

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/home",
                "https://example.com/pricing",
                "https://example.com/docs/start"
            ]
        );

        assert!(links[0].in_nav);
        assert!(!links[0].in_main);
        assert!(links[1].is_prominent);
        assert!(links[1].in_main);
        assert_eq!(links[1].title.as_deref(), Some("Plans"));
        assert_eq!(links[2].anchor_text, "getting started guide");
        assert!(links[2].context.contains("first."));
    }

    #[test]
    fn test_visible_text_skips_noise() {
        let html = r#"<html><head><style>.a{}</style></head><body>
            <nav>Menu</nav><p>Hello</p><script>var x;</script><footer>Foot</footer><p>World</p>
        </body></html>"#;
        let digest = PageDigest::parse(html, &url("https://e.com/"), &url("https://e.com/"), &[]);
        assert_eq!(digest.text, "Hello\nWorld");
    }

    #[test]
    fn test_semantic_sections() {
        let html = format!(
            r#"<html><body>
              <section id="intro"><h2>Intro</h2><p>{LONG}</p></section>
              <article class="post featured"><h3>Post</h3><p>{LONG}</p></article>
              <section><p>short</p></section>
              <section><p>{LONG}</p></section>
            </body></html>"#
        );
        let sections = identify_sections(&Html::parse_document(&html));

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].name, "intro");
        assert_eq!(sections[0].headers, vec!["Intro"]);
        assert_eq!(sections[0].tag_kind, "section");
        assert_eq!(sections[1].name, "post featured");
        assert_eq!(sections[2].name, "section_2");
        assert!(sections[0].word_count > 10);
    }

    #[test]
    fn test_div_fallback_skips_nested_blocks() {
        let html = format!(
            r#"<html><body>
              <div class="outer"><p>{LONG}</p><div class="inner"><p>{LONG}</p></div></div>
              <div class="second"><p>{LONG}</p></div>
              <div class="tiny"><p>tiny</p></div>
            </body></html>"#
        );
        let sections = identify_sections(&Html::parse_document(&html));

        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "second"]);
        assert_eq!(sections[1].id, 1);
        assert_eq!(sections[1].tag_kind, "div");
    }

    #[test]
    fn test_sections_capped_at_eight() {
        let blocks: String = (0..12)
            .map(|i| format!(r#"<div class="b{i}"><p>{LONG}</p></div>"#))
            .collect();
        let html = format!("<html><body>{blocks}</body></html>");
        assert_eq!(identify_sections(&Html::parse_document(&html)).len(), MAX_SECTIONS);
    }

    #[test]
    fn test_digest_headers_and_title() {
        let html = r#"<html><head><title> Docs Home </title></head><body>
            <h1>Welcome</h1><h2></h2><h3>Topics</h3><h4>Ignored</h4>
        </body></html>"#;
        let digest = PageDigest::parse(html, &url("https://e.com/"), &url("https://e.com/"), &[]);
        assert_eq!(digest.title.as_deref(), Some("Docs Home"));
        assert_eq!(digest.headers, vec!["Welcome", "Topics"]);
    }
}
