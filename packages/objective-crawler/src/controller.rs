//! Crawl phase controller.
//!
//! Drives `Init → Reconnaissance → StructureAnalysis → DeepCrawl → Done`.
//! Each batch of URLs is fetched and extracted concurrently; the controller
//! waits for the whole batch before touching the frontier, the visited log
//! or the site model. Tasks only ever see those through shared borrows.

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ConfigError;
use crate::extraction::{update_site_model, ExtractionCoordinator};
use crate::frontier::Frontier;
use crate::html::{normalize_url, PageDigest};
use crate::oracle::{prompts::NavigationProgress, OracleAdapter};
use crate::report::CrawlReport;
use crate::scoring::{prefilter_for_navigation, select_heuristic_next_hops, select_top_links_for_recon};
use crate::traits::{fetcher::PageFetcher, oracle::Oracle};
use crate::types::{
    config::{CrawlConfig, NavigationPolicy},
    extraction::{ExtractionResult, SiteStrategy, StrategyKind},
    link::UrlCandidate,
    objective::CrawlObjective,
    page::VisitedPage,
    site_model::SiteModel,
};

/// Links accepted per URL pattern when picking recon and seed links.
const MAX_LINKS_PER_PATTERN: usize = 2;

/// Crawl phases. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Reconnaissance,
    StructureAnalysis,
    DeepCrawl,
    Done,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Init => Phase::Reconnaissance,
            Phase::Reconnaissance => Phase::StructureAnalysis,
            Phase::StructureAnalysis => Phase::DeepCrawl,
            Phase::DeepCrawl | Phase::Done => Phase::Done,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Reconnaissance => "reconnaissance",
            Phase::StructureAnalysis => "structure_analysis",
            Phase::DeepCrawl => "deep_crawl",
            Phase::Done => "done",
        }
    }
}

/// What one fetch+extract task hands back to the controller.
struct PageOutcome {
    page: VisitedPage,
    /// Where the fetch ended up after redirects, normalized like a link
    final_url: String,
    extraction: ExtractionResult,
    links: Vec<UrlCandidate>,
}

/// Mutable crawl state. Only the controller's own control flow touches it.
struct CrawlState {
    phase: Phase,
    frontier: Frontier,
    visited: Vec<VisitedPage>,
    model: SiteModel,
    /// Links found on each reconnaissance page, used to seed the deep crawl
    recon_links: IndexMap<String, Vec<UrlCandidate>>,
    visited_after_recon: usize,
}

impl CrawlState {
    fn new(start: &Url) -> Self {
        Self {
            phase: Phase::Init,
            frontier: Frontier::new(start),
            visited: Vec::new(),
            model: SiteModel::new(),
            recon_links: IndexMap::new(),
            visited_after_recon: 0,
        }
    }

    /// Let the site model see every URL handed out, fetched or not.
    fn note_visits(&mut self, batch: &[String]) {
        for url in batch {
            self.model.note_visit(url);
        }
    }

    fn mark_redirects(&mut self, outcomes: &[PageOutcome]) {
        for outcome in outcomes {
            if outcome.final_url != outcome.page.url {
                debug!(from = %outcome.page.url, to = %outcome.final_url, "Followed redirect");
                self.frontier.mark_redirect_target(&outcome.final_url);
            }
        }
    }

    fn advance(&mut self) {
        let next = self.phase.next();
        info!(from = self.phase.label(), to = next.label(), "Phase transition");
        self.phase = next;
    }
}

/// Objective-driven crawler over a page fetcher and an Oracle.
///
/// # Example
///
/// ```rust,ignore
/// use objective_crawler::{CrawlConfig, ObjectiveCrawler};
/// use objective_crawler::fetchers::HttpFetcher;
/// use objective_crawler::oracle::OllamaOracle;
///
/// let config = CrawlConfig::new("https://docs.example.com", "API rate limits")
///     .with_max_pages(30);
/// let crawler = ObjectiveCrawler::new(HttpFetcher::new()?, OllamaOracle::from_env(), config);
/// let report = crawler.run().await?;
/// ```
pub struct ObjectiveCrawler<F: PageFetcher, O: Oracle> {
    fetcher: F,
    adapter: OracleAdapter<O>,
    coordinator: ExtractionCoordinator,
    config: CrawlConfig,
}

impl<F: PageFetcher, O: Oracle> ObjectiveCrawler<F, O> {
    pub fn new(fetcher: F, oracle: O, config: CrawlConfig) -> Self {
        let adapter = OracleAdapter::new(
            oracle,
            config.decision_model.clone(),
            config.extraction_model.clone(),
            config.oracle_timeout,
        );
        let coordinator =
            ExtractionCoordinator::new(config.extraction, config.thresholds.section_keep);

        Self {
            fetcher,
            adapter,
            coordinator,
            config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn adapter(&self) -> &OracleAdapter<O> {
        &self.adapter
    }

    /// Run a full crawl.
    ///
    /// Only an invalid configuration is an error, and it is reported before
    /// anything is fetched. Every later failure is absorbed and the crawl
    /// returns whatever it gathered.
    pub async fn run(&self) -> Result<CrawlReport, ConfigError> {
        let start = self.config.validate()?;

        info!(
            url = %start,
            objective = %self.config.objective,
            max_pages = self.config.max_pages,
            concurrency = self.config.concurrency,
            "Starting crawl"
        );

        let mut state = CrawlState::new(&start);
        let objective = self.adapter.analyze_objective(&self.config.objective).await;

        state.advance();
        self.reconnaissance(&objective, &start, &mut state).await;
        state.visited_after_recon = state.frontier.visited_count();

        state.advance();
        let strategy = self.analyze_structure(&objective, &mut state).await;

        state.advance();
        self.deep_crawl(&objective, &start, &mut state).await;

        state.advance();
        info!(
            pages = state.visited.len(),
            visited = state.frontier.visited_count(),
            high_value = state.model.high_value_pages.len(),
            avg_relevance = %format!("{:.1}", state.model.average_relevance()),
            "Crawl complete"
        );

        Ok(CrawlReport {
            objective,
            pages: state.visited,
            site_model: state.model,
            strategy,
            urls_visited: state.frontier.visited_count(),
            urls_visited_in_recon: state.visited_after_recon,
            thresholds: self.config.thresholds,
        })
    }

    async fn reconnaissance(&self, objective: &CrawlObjective, start: &Url, state: &mut CrawlState) {
        let budget = self.config.recon_budget();
        info!(budget, "Reconnaissance started");

        state.frontier.enqueue_url(start.as_str());

        while !state.frontier.is_empty() && state.frontier.visited_count() < budget {
            let remaining = budget - state.frontier.visited_count();
            let batch = state
                .frontier
                .dequeue_batch(self.config.concurrency.min(remaining));
            if batch.is_empty() {
                break;
            }
            state.note_visits(&batch);

            let outcomes = self.process_batch(&batch, objective, start).await;
            state.mark_redirects(&outcomes);

            for outcome in outcomes {
                update_site_model(
                    &mut state.model,
                    &outcome.page.url,
                    &outcome.extraction,
                    self.config.thresholds.high_value,
                );

                let fresh = state.frontier.unvisited_links(&outcome.links);
                let selected = select_top_links_for_recon(
                    &fresh,
                    objective,
                    self.config.recon_links_per_page,
                    MAX_LINKS_PER_PATTERN,
                );
                let queued = selected
                    .iter()
                    .filter(|link| state.frontier.enqueue(link))
                    .count();
                debug!(
                    url = %outcome.page.url,
                    found = outcome.links.len(),
                    queued,
                    "Selected reconnaissance links"
                );

                state
                    .recon_links
                    .insert(outcome.page.url.clone(), outcome.links);
                state.visited.push(outcome.page);
            }

            info!(
                visited = state.frontier.visited_count(),
                budget,
                queue = state.frontier.len(),
                "Reconnaissance progress"
            );
        }
    }

    async fn analyze_structure(&self, objective: &CrawlObjective, state: &mut CrawlState) -> SiteStrategy {
        let strategy = self
            .adapter
            .summarize_site_structure(&objective.text, &state.visited, &state.model)
            .await;

        info!(
            site_type = %strategy.site_type,
            focus = %strategy.recommended_focus,
            strategy = ?strategy.strategy,
            "Structure analysis complete"
        );
        if strategy.strategy == StrategyKind::SiteNotSuitable {
            warn!("Site judged unsuitable for the objective, continuing deep crawl anyway");
        }

        state.model.merge_strategy(&strategy);
        strategy
    }

    async fn deep_crawl(&self, objective: &CrawlObjective, start: &Url, state: &mut CrawlState) {
        let budget = self
            .config
            .max_pages
            .saturating_sub(state.frontier.visited_count());
        info!(budget, "Deep crawl started");

        let seeds = self.seed_urls(objective, state);
        state.frontier.clear_queue();
        let seeded = seeds
            .iter()
            .filter(|url| state.frontier.enqueue_url(url))
            .count();
        info!(seeded, "Deep crawl queue seeded");

        let batch_size = self.config.deep_batch_size();
        while !state.frontier.is_empty() && state.frontier.visited_count() < self.config.max_pages {
            let remaining = self.config.max_pages - state.frontier.visited_count();
            let batch = state.frontier.dequeue_batch(batch_size.min(remaining));
            if batch.is_empty() {
                break;
            }

            state.note_visits(&batch);

            let outcomes = self.process_batch(&batch, objective, start).await;
            state.mark_redirects(&outcomes);

            for outcome in &outcomes {
                update_site_model(
                    &mut state.model,
                    &outcome.page.url,
                    &outcome.extraction,
                    self.config.thresholds.high_value,
                );
            }

            let progress = NavigationProgress {
                visited: state.frontier.visited_count(),
                max_pages: self.config.max_pages,
                high_value_pages: state.model.high_value_pages.len(),
                phase: Phase::DeepCrawl.label(),
            };
            let fresh: Vec<Vec<UrlCandidate>> = outcomes
                .iter()
                .map(|outcome| state.frontier.unvisited_links(&outcome.links))
                .collect();
            let selections = join_all(outcomes.iter().zip(&fresh).map(|(outcome, links)| {
                self.next_hops(objective, &outcome.page, links, &state.model, progress)
            }))
            .await;

            for (outcome, selected) in outcomes.into_iter().zip(selections) {
                let queued = selected
                    .iter()
                    .filter(|url| state.frontier.enqueue_url(url))
                    .count();
                debug!(
                    url = %outcome.page.url,
                    selected = selected.len(),
                    queued,
                    "Navigation decided"
                );
                state.visited.push(outcome.page);
            }

            info!(
                visited = state.frontier.visited_count(),
                max_pages = self.config.max_pages,
                queue = state.frontier.len(),
                high_value = state.model.high_value_pages.len(),
                "Deep crawl progress"
            );
        }
    }

    /// Seed links for the deep crawl: the best links of every recon page that
    /// cleared the crawl threshold, first-seen order, nothing visited.
    fn seed_urls(&self, objective: &CrawlObjective, state: &CrawlState) -> Vec<String> {
        let mut seeds = IndexSet::new();
        for page in &state.visited {
            if page.relevance_score < self.config.thresholds.crawl {
                continue;
            }
            let Some(links) = state.recon_links.get(&page.url) else {
                continue;
            };
            let fresh = state.frontier.unvisited_links(links);
            let selected = select_top_links_for_recon(
                &fresh,
                objective,
                self.config.seed_links_per_page,
                MAX_LINKS_PER_PATTERN,
            );
            seeds.extend(selected.into_iter().map(|link| link.url));
        }
        seeds.into_iter().collect()
    }

    /// Choose next hops among a page's unvisited links under the configured
    /// policy.
    async fn next_hops(
        &self,
        objective: &CrawlObjective,
        page: &VisitedPage,
        links: &[UrlCandidate],
        model: &SiteModel,
        progress: NavigationProgress<'_>,
    ) -> Vec<String> {
        let candidates = prefilter_for_navigation(links, objective, model);
        let max = self.config.max_links_to_select;

        match self.config.navigation {
            NavigationPolicy::Heuristic => {
                select_heuristic_next_hops(&candidates, self.config.thresholds.crawl, max)
            }
            NavigationPolicy::AiGuided => {
                self.adapter
                    .select_navigation_links(
                        &objective.text,
                        page,
                        &candidates,
                        model,
                        progress,
                        max,
                    )
                    .await
            }
        }
    }

    /// Fetch and extract a batch concurrently. Results arrive in completion
    /// order; failed URLs are dropped.
    async fn process_batch(
        &self,
        urls: &[String],
        objective: &CrawlObjective,
        scope: &Url,
    ) -> Vec<PageOutcome> {
        info!(size = urls.len(), "Processing batch");

        urls.iter()
            .map(|url| self.process_url(url, objective, scope))
            .collect::<FuturesUnordered<_>>()
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await
    }

    async fn process_url(&self, url: &str, objective: &CrawlObjective, scope: &Url) -> Option<PageOutcome> {
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "Fetch failed, skipping");
                return None;
            }
        };

        let base = Url::parse(&page.final_url)
            .or_else(|_| Url::parse(url))
            .ok()?;
        let final_url = normalize_url(base.as_str(), &base).unwrap_or_else(|| url.to_string());
        let digest = PageDigest::parse(&page.html, &base, scope, &objective.analysis.avoid_patterns);

        let extraction = self
            .coordinator
            .extract(&self.adapter, objective, &page, &digest)
            .await;

        info!(
            url = %url,
            page_type = %extraction.page_type,
            relevance = extraction.relevance_score,
            method = ?extraction.method,
            sections = extraction.sections.len(),
            links = digest.links.len(),
            "Page extracted"
        );

        Some(PageOutcome {
            page: VisitedPage::from_extraction(&page, extraction.clone()),
            final_url,
            extraction,
            links: digest.links,
        })
    }
}
