//! Content extraction coordinator.
//!
//! Chooses between section-aware and whole-page extraction, merges section
//! verdicts into a page result, and degrades step by step when the Oracle
//! fails: sections, then whole page, then a last-resort extraction built
//! from the HTML alone.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::html::{truncate_chars, PageDigest};
use crate::oracle::{parse::SectionReply, OracleAdapter, OracleOutcome};
use crate::traits::oracle::Oracle;
use crate::types::{
    config::ExtractionPolicy,
    extraction::{ExtractionMethod, ExtractionResult, KeyContent},
    objective::CrawlObjective,
    page::{FetchedPage, PageSection},
    site_model::SiteModel,
};

/// Sections needed before section-aware extraction is attempted.
const MIN_SECTIONS: usize = 2;

/// Text characters kept by the last-resort extraction.
const FALLBACK_EXCERPT: usize = 500;

/// Relevance assigned by the last-resort extraction.
const FALLBACK_RELEVANCE: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct ExtractionCoordinator {
    policy: ExtractionPolicy,
    section_keep: f32,
}

impl ExtractionCoordinator {
    pub fn new(policy: ExtractionPolicy, section_keep: f32) -> Self {
        Self {
            policy,
            section_keep,
        }
    }

    /// Extract one page. Never fails; the worst case is the last-resort
    /// extraction.
    pub async fn extract<O: Oracle>(
        &self,
        adapter: &OracleAdapter<O>,
        objective: &CrawlObjective,
        page: &FetchedPage,
        digest: &PageDigest,
    ) -> ExtractionResult {
        if self.policy == ExtractionPolicy::SectionAware && digest.sections.len() >= MIN_SECTIONS {
            match adapter
                .extract_sections(objective, &page.url, &digest.sections)
                .await
            {
                OracleOutcome::Ok(reply) => {
                    let result = merge_sections(reply, &digest.sections, self.section_keep);
                    debug!(
                        url = %page.url,
                        sections = digest.sections.len(),
                        relevance = result.relevance_score,
                        "Section extraction complete"
                    );
                    return result;
                }
                failed => warn!(
                    url = %page.url,
                    error = %failed.failure().unwrap_or_default(),
                    "Section extraction failed, trying whole page"
                ),
            }
        }

        let content = if page.markdown.trim().is_empty() {
            digest.text.as_str()
        } else {
            page.markdown.as_str()
        };

        match adapter
            .extract_whole_page(objective, &page.url, &digest.headers, content)
            .await
        {
            OracleOutcome::Ok(result) => result,
            failed => {
                warn!(
                    url = %page.url,
                    error = %failed.failure().unwrap_or_default(),
                    "Page extraction failed, using fallback extraction"
                );
                fallback_extraction(page, digest)
            }
        }
    }
}

/// Merge per-section verdicts into a page result.
///
/// Page relevance is the best section score. Only sections at or above
/// `keep` contribute content, keyed `section_{id}_{name}`.
pub fn merge_sections(reply: SectionReply, sections: &[PageSection], keep: f32) -> ExtractionResult {
    let mut key_content = KeyContent::new();
    let mut best: f32 = 0.0;

    for analysis in &reply.sections {
        best = best.max(analysis.relevance_score);
        if analysis.relevance_score < keep {
            continue;
        }
        let Some(content) = &analysis.extracted_content else {
            continue;
        };
        let name = sections
            .get(analysis.section_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("section_{}", analysis.section_id));
        key_content.insert(format!("section_{}_{}", analysis.section_id, name), content.clone());
    }

    ExtractionResult {
        page_type: reply.page_type,
        relevance_score: best,
        key_content,
        reasoning: format!(
            "Analyzed {} sections. Best section scored {:.1}/10.",
            sections.len(),
            best
        ),
        content_summary: reply.content_summary,
        sections: reply.sections,
        method: ExtractionMethod::Sections,
    }
}

/// Extraction built without the Oracle.
pub fn fallback_extraction(page: &FetchedPage, digest: &PageDigest) -> ExtractionResult {
    let title = digest
        .title
        .clone()
        .or_else(|| page.title.clone())
        .unwrap_or_else(|| "No title".to_string());

    let mut key_content = KeyContent::new();
    key_content.insert("title".to_string(), Value::String(title));
    key_content.insert("headers".to_string(), json!(digest.headers));
    key_content.insert(
        "text_excerpt".to_string(),
        Value::String(truncate_chars(&digest.text, FALLBACK_EXCERPT)),
    );

    ExtractionResult {
        page_type: "unknown".to_string(),
        relevance_score: FALLBACK_RELEVANCE,
        key_content,
        reasoning: "Fallback extraction due to error".to_string(),
        content_summary: "Content extracted with fallback method".to_string(),
        sections: Vec::new(),
        method: ExtractionMethod::Fallback,
    }
}

/// Teach the site model from an extraction. Fallback results are ignored.
pub fn update_site_model(
    model: &mut SiteModel,
    url: &str,
    result: &ExtractionResult,
    high_value_threshold: f32,
) {
    if !result.method.is_oracle_derived() {
        return;
    }
    model.record(url, &result.page_type, result.relevance_score, high_value_threshold);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockOracle, MockOracleCall};
    use crate::types::{extraction::SectionAnalysis, objective::ObjectiveAnalysis};
    use std::time::Duration;

    const LONG: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

    fn section(id: usize, name: &str) -> PageSection {
        PageSection {
            id,
            name: name.to_string(),
            headers: vec![],
            text_preview: LONG.to_string(),
            word_count: 19,
            tag_kind: "section".to_string(),
        }
    }

    fn verdict(id: usize, score: f32, content: Option<Value>) -> SectionAnalysis {
        SectionAnalysis {
            section_id: id,
            relevance_score: score,
            reason: String::new(),
            extracted_content: content,
        }
    }

    fn objective() -> CrawlObjective {
        CrawlObjective::new("pricing plans", ObjectiveAnalysis::default())
    }

    fn adapter(oracle: MockOracle) -> OracleAdapter<MockOracle> {
        OracleAdapter::new(oracle, "d", "e", Duration::from_secs(5))
    }

    fn sectioned_page() -> (FetchedPage, PageDigest) {
        let html = format!(
            r#"<html><head><title>Plans</title></head><body>
              <section id="hero"><h1>Plans</h1><p>{LONG}</p></section>
              <section id="pricing"><h2>Pricing</h2><p>{LONG}</p></section>
            </body></html>"#
        );
        let url = url::Url::parse("https://example.com/plans").unwrap();
        let digest = PageDigest::parse(&html, &url, &url, &[]);
        (FetchedPage::new(url.as_str(), html), digest)
    }

    fn simple_page() -> (FetchedPage, PageDigest) {
        let html = "<html><head><title>About</title></head><body><h1>About us</h1><p>We sell plans.</p></body></html>";
        let url = url::Url::parse("https://example.com/about").unwrap();
        let digest = PageDigest::parse(html, &url, &url, &[]);
        (FetchedPage::new(url.as_str(), html), digest)
    }

    #[test]
    fn test_merge_uses_max_and_keeps_relevant_sections() {
        let sections = vec![section(0, "hero"), section(1, "pricing"), section(2, "faq")];
        let reply = SectionReply {
            page_type: "pricing".to_string(),
            sections: vec![
                verdict(0, 2.0, Some(json!({"x": 1}))),
                verdict(1, 8.0, Some(json!({"plan": "Pro"}))),
                verdict(2, 5.0, Some(json!({"q": "Refunds?"}))),
            ],
            content_summary: "Plans and FAQ".to_string(),
        };

        let result = merge_sections(reply, &sections, 4.0);

        assert_eq!(result.relevance_score, 8.0);
        assert_eq!(result.method, ExtractionMethod::Sections);
        let keys: Vec<&String> = result.key_content.keys().collect();
        assert_eq!(keys, vec!["section_1_pricing", "section_2_faq"]);
        assert_eq!(result.sections.len(), 3);
    }

    #[test]
    fn test_merge_with_no_verdicts_scores_zero() {
        let reply = SectionReply {
            page_type: "unknown".to_string(),
            sections: vec![],
            content_summary: String::new(),
        };
        let result = merge_sections(reply, &[section(0, "a"), section(1, "b")], 4.0);
        assert_eq!(result.relevance_score, 0.0);
        assert!(result.key_content.is_empty());
    }

    #[test]
    fn test_merge_names_unknown_sections_by_id() {
        let reply = SectionReply {
            page_type: "x".to_string(),
            sections: vec![verdict(7, 6.0, Some(json!("text")))],
            content_summary: String::new(),
        };
        let result = merge_sections(reply, &[section(0, "a")], 4.0);
        assert!(result.key_content.contains_key("section_7_section_7"));
    }

    #[tokio::test]
    async fn test_sectioned_page_uses_section_prompt() {
        let oracle = MockOracle::new().with_reply_containing(
            "SECTION BY SECTION",
            r#"{"page_type": "pricing", "sections_analysis": [
                {"section_id": 0, "relevance_score": 3},
                {"section_id": 1, "relevance_score": 9, "extracted_content": {"plan": "Pro"}}
            ], "content_summary": "Prices"}"#,
        );
        let (page, digest) = sectioned_page();
        let coordinator = ExtractionCoordinator::new(ExtractionPolicy::SectionAware, 4.0);

        let result = coordinator
            .extract(&adapter(oracle.clone()), &objective(), &page, &digest)
            .await;

        assert_eq!(result.method, ExtractionMethod::Sections);
        assert_eq!(result.relevance_score, 9.0);
        assert!(result.key_content.contains_key("section_1_pricing"));
        assert_eq!(oracle.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_whole_page_policy_skips_sections() {
        let oracle = MockOracle::new().with_reply_containing(
            "PAGE CONTENT",
            r#"{"page_type": "pricing", "relevance_score": 7, "key_content": {"plans": ["Pro"]}}"#,
        );
        let (page, digest) = sectioned_page();
        let coordinator = ExtractionCoordinator::new(ExtractionPolicy::WholePage, 4.0);

        let result = coordinator
            .extract(&adapter(oracle), &objective(), &page, &digest)
            .await;

        assert_eq!(result.method, ExtractionMethod::WholePage);
        assert_eq!(result.relevance_score, 7.0);
    }

    #[tokio::test]
    async fn test_section_failure_falls_back_to_whole_page() {
        let oracle = MockOracle::new()
            .with_reply_containing("SECTION BY SECTION", "not json at all")
            .with_reply_containing("PAGE CONTENT", r#"{"page_type": "pricing", "relevance_score": 6}"#);
        let (page, digest) = sectioned_page();
        let coordinator = ExtractionCoordinator::new(ExtractionPolicy::SectionAware, 4.0);

        let result = coordinator
            .extract(&adapter(oracle.clone()), &objective(), &page, &digest)
            .await;

        assert_eq!(result.method, ExtractionMethod::WholePage);
        assert_eq!(result.relevance_score, 6.0);
        assert_eq!(oracle.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_total_failure_uses_fallback() {
        let (page, digest) = simple_page();
        let coordinator = ExtractionCoordinator::new(ExtractionPolicy::SectionAware, 4.0);

        let result = coordinator
            .extract(&adapter(MockOracle::new().fail_all()), &objective(), &page, &digest)
            .await;

        assert_eq!(result.method, ExtractionMethod::Fallback);
        assert_eq!(result.page_type, "unknown");
        assert_eq!(result.relevance_score, 5.0);
        assert_eq!(result.key_content["title"], json!("About"));
        assert_eq!(result.key_content["headers"], json!(["About us"]));
        assert!(result.key_content["text_excerpt"]
            .as_str()
            .unwrap()
            .contains("We sell plans."));
    }

    #[tokio::test]
    async fn test_whole_page_prompt_carries_markdown_when_present() {
        let oracle = MockOracle::new();
        let (page, digest) = simple_page();
        let page = page.with_markdown("# About us\n\nMARKDOWN BODY");
        let coordinator = ExtractionCoordinator::new(ExtractionPolicy::SectionAware, 4.0);

        coordinator
            .extract(&adapter(oracle.clone()), &objective(), &page, &digest)
            .await;

        let calls = oracle.calls();
        let MockOracleCall { model, prompt } = &calls[0];
        assert_eq!(model, "e");
        assert!(prompt.contains("MARKDOWN BODY"));
    }

    #[test]
    fn test_fallback_results_do_not_teach_model() {
        let (page, digest) = simple_page();
        let mut model = SiteModel::new();

        let fallback = fallback_extraction(&page, &digest);
        update_site_model(&mut model, &page.url, &fallback, 6.0);
        assert!(model.relevance_by_url.is_empty());

        let mut learned = fallback.clone();
        learned.method = ExtractionMethod::WholePage;
        learned.relevance_score = 7.0;
        update_site_model(&mut model, &page.url, &learned, 6.0);
        assert!(model.high_value_patterns.contains("/about"));
    }
}
