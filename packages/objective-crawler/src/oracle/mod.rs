//! Oracle decision adapter.
//!
//! Wraps every LLM call the crawl makes. Each call yields an [`OracleOutcome`]
//! and the caller picks the fallback explicitly; the convenience methods on
//! [`OracleAdapter`] apply the documented fallback for each decision.

pub mod ollama;
pub mod openai;
pub mod parse;
pub mod prompts;

pub use ollama::OllamaOracle;
pub use openai::OpenAiOracle;

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::OracleError;
use crate::traits::oracle::Oracle;
use crate::types::{
    extraction::{ExtractionResult, SiteStrategy, StrategyKind},
    link::ScoredLink,
    objective::{CrawlObjective, ObjectiveAnalysis},
    page::{PageSection, VisitedPage},
    site_model::SiteModel,
};

use self::parse::SectionReply;
use self::prompts::NavigationProgress;

/// Candidates returned when navigation selection fails.
const NAVIGATION_FALLBACK: usize = 3;

/// Result of a single Oracle call.
#[derive(Debug)]
pub enum OracleOutcome<T> {
    /// Call succeeded and the reply had the expected shape
    Ok(T),
    /// Transport failure, backend error or timeout
    CallFailed(OracleError),
    /// Reply arrived but could not be read
    FormatInvalid { reason: String },
}

impl<T> OracleOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, OracleOutcome::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            OracleOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OracleOutcome<U> {
        match self {
            OracleOutcome::Ok(value) => OracleOutcome::Ok(f(value)),
            OracleOutcome::CallFailed(e) => OracleOutcome::CallFailed(e),
            OracleOutcome::FormatInvalid { reason } => OracleOutcome::FormatInvalid { reason },
        }
    }

    /// Validate or reshape the payload; an `Err` becomes `FormatInvalid`.
    pub fn and_then_parse<U>(self, f: impl FnOnce(T) -> Result<U, String>) -> OracleOutcome<U> {
        match self {
            OracleOutcome::Ok(value) => match f(value) {
                Ok(parsed) => OracleOutcome::Ok(parsed),
                Err(reason) => OracleOutcome::FormatInvalid { reason },
            },
            OracleOutcome::CallFailed(e) => OracleOutcome::CallFailed(e),
            OracleOutcome::FormatInvalid { reason } => OracleOutcome::FormatInvalid { reason },
        }
    }

    /// Human-readable failure, `None` on success.
    pub fn failure(&self) -> Option<String> {
        match self {
            OracleOutcome::Ok(_) => None,
            OracleOutcome::CallFailed(e) => Some(e.to_string()),
            OracleOutcome::FormatInvalid { reason } => Some(reason.clone()),
        }
    }
}

/// Prompt construction, call deadlines and reply parsing around an [`Oracle`].
pub struct OracleAdapter<O: Oracle> {
    oracle: O,
    decision_model: String,
    extraction_model: String,
    timeout: Duration,
}

impl<O: Oracle> OracleAdapter<O> {
    pub fn new(
        oracle: O,
        decision_model: impl Into<String>,
        extraction_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            decision_model: decision_model.into(),
            extraction_model: extraction_model.into(),
            timeout,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Call the Oracle under the per-call deadline and return the raw reply.
    pub async fn ask_text(&self, model: &str, prompt: &str) -> OracleOutcome<String> {
        match tokio::time::timeout(self.timeout, self.oracle.generate(model, prompt)).await {
            Err(_) => OracleOutcome::CallFailed(OracleError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
            Ok(Err(e)) => OracleOutcome::CallFailed(e),
            Ok(Ok(reply)) if reply.trim().is_empty() => {
                OracleOutcome::CallFailed(OracleError::EmptyResponse)
            }
            Ok(Ok(reply)) => OracleOutcome::Ok(reply),
        }
    }

    /// Call the Oracle and parse the reply as JSON.
    pub async fn ask_json(&self, model: &str, prompt: &str) -> OracleOutcome<Value> {
        self.ask_text(model, prompt)
            .await
            .and_then_parse(|reply| parse::parse_json(&reply))
    }

    pub async fn request_objective_analysis(&self, objective: &str) -> OracleOutcome<ObjectiveAnalysis> {
        let prompt = prompts::format_objective_prompt(objective);
        self.ask_json(&self.decision_model, &prompt)
            .await
            .and_then_parse(|value| parse::objective_analysis(&value))
    }

    /// Analyse the objective, substituting the fixed default on any failure.
    pub async fn analyze_objective(&self, objective: &str) -> CrawlObjective {
        let outcome = self.request_objective_analysis(objective).await;
        let analysis = match outcome {
            OracleOutcome::Ok(analysis) => {
                info!(
                    data_types = ?analysis.data_types,
                    seek = ?analysis.seek_patterns,
                    avoid = ?analysis.avoid_patterns,
                    "Objective analysis complete"
                );
                analysis
            }
            failed => {
                warn!(
                    error = %failed.failure().unwrap_or_default(),
                    "Objective analysis failed, using default analysis"
                );
                ObjectiveAnalysis::default()
            }
        };
        CrawlObjective::new(objective, analysis)
    }

    /// Ask which candidates to visit next.
    ///
    /// `Ok` holds URLs in reply order: integer tokens mapped to 1-based
    /// candidate indices, out-of-range and repeated indices dropped, capped at
    /// `max`. A reply with no integers (such as `NONE`) selects nothing.
    pub async fn request_navigation(
        &self,
        objective: &str,
        current: &VisitedPage,
        candidates: &[ScoredLink],
        model: &SiteModel,
        progress: NavigationProgress<'_>,
        max: usize,
    ) -> OracleOutcome<Vec<String>> {
        let patterns: Vec<String> = model.high_value_patterns.iter().cloned().collect();
        let prompt =
            prompts::format_navigation_prompt(objective, current, candidates, &patterns, progress);

        self.ask_text(&self.decision_model, &prompt)
            .await
            .map(|reply| select_by_indices(&parse::clean_reply(&reply), candidates, max))
    }

    /// Pick next hops, falling back to the top three candidates on failure.
    pub async fn select_navigation_links(
        &self,
        objective: &str,
        current: &VisitedPage,
        candidates: &[ScoredLink],
        model: &SiteModel,
        progress: NavigationProgress<'_>,
        max: usize,
    ) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }

        match self
            .request_navigation(objective, current, candidates, model, progress, max)
            .await
        {
            OracleOutcome::Ok(selected) => {
                debug!(url = %current.url, selected = selected.len(), "Navigator selected links");
                selected
            }
            failed => {
                warn!(
                    url = %current.url,
                    error = %failed.failure().unwrap_or_default(),
                    "Navigation selection failed, taking top candidates"
                );
                candidates
                    .iter()
                    .take(NAVIGATION_FALLBACK)
                    .map(|link| link.url().to_string())
                    .collect()
            }
        }
    }

    pub async fn request_site_structure(
        &self,
        objective: &str,
        pages: &[VisitedPage],
        model: &SiteModel,
    ) -> OracleOutcome<SiteStrategy> {
        let patterns: Vec<String> = model.high_value_patterns.iter().cloned().collect();
        let prompt = prompts::format_structure_prompt(objective, pages, &patterns);
        self.ask_json(&self.decision_model, &prompt)
            .await
            .and_then_parse(|value| parse::site_strategy(&value))
    }

    /// Summarize reconnaissance; on failure keep crawling every page type seen.
    pub async fn summarize_site_structure(
        &self,
        objective: &str,
        pages: &[VisitedPage],
        model: &SiteModel,
    ) -> SiteStrategy {
        match self.request_site_structure(objective, pages, model).await {
            OracleOutcome::Ok(strategy) => strategy,
            failed => {
                warn!(
                    error = %failed.failure().unwrap_or_default(),
                    "Structure analysis failed, continuing with all page types"
                );
                fallback_strategy(pages, model)
            }
        }
    }

    pub async fn extract_sections(
        &self,
        objective: &CrawlObjective,
        url: &str,
        sections: &[PageSection],
    ) -> OracleOutcome<SectionReply> {
        let prompt = prompts::format_section_prompt(objective, url, sections);
        self.ask_json(&self.extraction_model, &prompt)
            .await
            .and_then_parse(|value| parse::section_reply(&value))
    }

    pub async fn extract_whole_page(
        &self,
        objective: &CrawlObjective,
        url: &str,
        headers: &[String],
        content: &str,
    ) -> OracleOutcome<ExtractionResult> {
        let prompt = prompts::format_whole_page_prompt(objective, url, headers, content);
        self.ask_json(&self.extraction_model, &prompt)
            .await
            .and_then_parse(|value| parse::whole_page_extraction(&value))
    }
}

/// Map 1-based indices in `reply` onto `candidates`.
pub fn select_by_indices(reply: &str, candidates: &[ScoredLink], max: usize) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for n in parse::integer_tokens(reply) {
        if selected.len() >= max {
            break;
        }
        let Some(link) = n.checked_sub(1).and_then(|i| candidates.get(i)) else {
            continue;
        };
        if !selected.iter().any(|url| url == link.url()) {
            selected.push(link.url().to_string());
        }
    }
    selected
}

/// Strategy used when structure analysis fails.
pub fn fallback_strategy(pages: &[VisitedPage], model: &SiteModel) -> SiteStrategy {
    let valuable_page_types = prompts::page_type_distribution(pages)
        .into_iter()
        .map(|(page_type, _)| page_type)
        .collect();

    SiteStrategy {
        site_type: "unknown".to_string(),
        valuable_page_types,
        recommended_focus: "Continue crawling all page types".to_string(),
        high_priority_patterns: model.high_value_patterns.iter().cloned().collect(),
        strategy: StrategyKind::ContinueDeep,
    }
}
