//! Heuristic relevance scoring.
//!
//! Everything here is pure: the same inputs always give the same scores, and
//! every score is clamped to [0, 10].

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{
    link::{Priority, ScoredLink, UrlCandidate},
    objective::CrawlObjective,
    site_model::SiteModel,
};

/// Keywords that mark pages rarely worth fetching.
pub const LOW_VALUE_KEYWORDS: &[&str] = &[
    "privacy",
    "policy",
    "terms",
    "cookie",
    "login",
    "signin",
    "signup",
    "register",
    "cart",
    "checkout",
    "account",
    "subscribe",
    "newsletter",
];

const BASE_SCORE: f32 = 5.0;
const MIN_SCORE: f32 = 0.0;
const MAX_SCORE: f32 = 10.0;

/// Recon links scoring below this are never selected.
const RECON_MIN_SCORE: f32 = 3.0;

/// Raw candidates considered by the deep-crawl pre-filter.
pub const PREFILTER_WINDOW: usize = 30;

/// Candidates kept after the deep-crawl pre-filter.
pub const NAVIGATION_CANDIDATES: usize = 12;

fn clamp(score: f32) -> f32 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Score a link for reconnaissance.
pub fn score_link(candidate: &UrlCandidate, objective: &CrawlObjective) -> f32 {
    let text = format!("{} {}", candidate.anchor_text, candidate.context).to_lowercase();
    let path = candidate.url_path().to_lowercase();
    let mentions = |needle: &str| text.contains(needle) || path.contains(needle);

    let mut score = BASE_SCORE;

    for keyword in LOW_VALUE_KEYWORDS {
        if mentions(keyword) {
            score -= 3.0;
        }
    }

    if candidate.in_main {
        score += 2.0;
    }
    if candidate.is_prominent {
        score += 1.5;
    }
    if candidate.in_nav {
        score -= 1.0;
    }

    for keyword in objective.keywords() {
        if text.contains(&keyword) {
            score += 2.0;
        }
        if path.contains(&keyword) {
            score += 1.5;
        }
    }

    let analysis = &objective.analysis;
    for data_type in &analysis.data_types {
        if mentions(&data_type.to_lowercase()) {
            score += 2.0;
        }
    }
    for pattern in &analysis.seek_patterns {
        if mentions(&pattern.to_lowercase()) {
            score += 3.0;
        }
    }

    clamp(score)
}

/// Pick up to `count` links for reconnaissance, best first.
///
/// Links scoring below 3 are skipped, and no generalized URL pattern
/// contributes more than `max_per_pattern` links.
pub fn select_top_links_for_recon(
    links: &[UrlCandidate],
    objective: &CrawlObjective,
    count: usize,
    max_per_pattern: usize,
) -> Vec<UrlCandidate> {
    let mut scored: Vec<(f32, &UrlCandidate)> = links
        .iter()
        .map(|link| (score_link(link, objective), link))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut per_pattern: HashMap<String, usize> = HashMap::new();
    let mut selected = Vec::new();

    for (score, link) in scored {
        if selected.len() >= count {
            break;
        }
        if score < RECON_MIN_SCORE {
            continue;
        }

        let used = per_pattern.entry(link.pattern()).or_insert(0);
        if *used >= max_per_pattern {
            continue;
        }
        *used += 1;
        selected.push(link.clone());
    }

    selected
}

/// Score one candidate for the deep-crawl pre-filter.
pub fn score_for_navigation(
    candidate: &UrlCandidate,
    objective: &CrawlObjective,
    model: &SiteModel,
) -> ScoredLink {
    let mut score = BASE_SCORE;

    if model.is_valuable_pattern(&candidate.pattern()) {
        score += 2.0;
    }
    if candidate.in_main {
        score += 1.0;
    }
    if candidate.is_prominent {
        score += 1.0;
    }

    let url = candidate.url.to_lowercase();
    if objective
        .analysis
        .seek_patterns
        .iter()
        .any(|pattern| url.contains(&pattern.to_lowercase()))
    {
        score += 2.0;
    }

    let score = clamp(score);
    ScoredLink {
        candidate: candidate.clone(),
        score,
        historical_average: model.historical_average(&candidate.url),
        priority: Priority::from_score(score),
    }
}

/// Score the first 30 candidates and keep the best 12.
pub fn prefilter_for_navigation(
    links: &[UrlCandidate],
    objective: &CrawlObjective,
    model: &SiteModel,
) -> Vec<ScoredLink> {
    let mut scored: Vec<ScoredLink> = links
        .iter()
        .take(PREFILTER_WINDOW)
        .map(|link| score_for_navigation(link, objective, model))
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(NAVIGATION_CANDIDATES);
    scored
}

/// Whether a pre-scored link clears the crawl threshold.
pub fn should_crawl(link: &ScoredLink, threshold: f32) -> bool {
    link.score >= threshold
}

/// Next hops without consulting the Oracle: pre-filtered links that clear
/// the crawl threshold, best first.
pub fn select_heuristic_next_hops(
    candidates: &[ScoredLink],
    threshold: f32,
    max: usize,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|link| should_crawl(link, threshold))
        .take(max)
        .map(|link| link.url().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::objective::ObjectiveAnalysis;
    use proptest::prelude::*;

    fn objective(text: &str) -> CrawlObjective {
        CrawlObjective::new(
            text,
            ObjectiveAnalysis {
                data_types: vec![],
                seek_patterns: vec![],
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_login_link_is_penalized() {
        let link = UrlCandidate::new("https://example.com/account/login")
            .with_anchor("Login to your account");
        let score = score_link(&link, &objective("pricing plans"));
        assert!(score <= 2.0, "score was {score}");
    }

    #[test]
    fn test_base_score_without_signals() {
        let link = UrlCandidate::new("https://example.com/about").with_anchor("About us");
        assert_eq!(score_link(&link, &objective("pricing plans")), 5.0);
    }

    #[test]
    fn test_structural_flags() {
        let obj = objective("pricing plans");
        let main = UrlCandidate::new("https://example.com/x").with_anchor("Xx").in_main();
        let nav = UrlCandidate::new("https://example.com/x").with_anchor("Xx").in_nav();
        let heading = UrlCandidate::new("https://example.com/x")
            .with_anchor("Xx")
            .prominent();

        assert_eq!(score_link(&main, &obj), 7.0);
        assert_eq!(score_link(&nav, &obj), 4.0);
        assert_eq!(score_link(&heading, &obj), 6.5);
    }

    #[test]
    fn test_objective_keywords_in_text_and_path() {
        let link = UrlCandidate::new("https://example.com/pricing").with_anchor("See pricing");
        // "pricing" in text (+2) and in path (+1.5); "plans" nowhere
        assert_eq!(score_link(&link, &objective("pricing plans")), 8.5);
    }

    #[test]
    fn test_seek_patterns_and_data_types() {
        let obj = CrawlObjective::new(
            "x",
            ObjectiveAnalysis {
                data_types: vec!["Recipes".to_string()],
                seek_patterns: vec!["/recipe".to_string()],
                ..Default::default()
            },
        );
        let link = UrlCandidate::new("https://example.com/recipe/soup").with_anchor("Soup recipes");
        assert_eq!(score_link(&link, &obj), 10.0);
    }

    #[test]
    fn test_recon_selection_limits_patterns() {
        let obj = objective("guides");
        let links: Vec<UrlCandidate> = (0..5)
            .map(|i| UrlCandidate::new(format!("https://example.com/post/{i}")).with_anchor("Post"))
            .chain(std::iter::once(
                UrlCandidate::new("https://example.com/about").with_anchor("About"),
            ))
            .collect();

        let selected = select_top_links_for_recon(&links, &obj, 8, 2);
        assert_eq!(selected.len(), 3);
        assert_eq!(
            selected
                .iter()
                .filter(|l| l.pattern() == "/post/*")
                .count(),
            2
        );
    }

    #[test]
    fn test_recon_selection_skips_low_scores() {
        let obj = objective("guides");
        let links = vec![
            UrlCandidate::new("https://example.com/login").with_anchor("Login"),
            UrlCandidate::new("https://example.com/guides").with_anchor("Guides"),
        ];
        let selected = select_top_links_for_recon(&links, &obj, 8, 2);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].url, "https://example.com/guides");
    }

    #[test]
    fn test_prefilter_prefers_learned_patterns() {
        let obj = objective("docs");
        let mut model = SiteModel::new();
        model.record("https://example.com/docs/1", "docs", 9.0, 6.0);

        let links = vec![
            UrlCandidate::new("https://example.com/blog/a").with_anchor("Blog"),
            UrlCandidate::new("https://example.com/docs/7").with_anchor("Doc 7"),
        ];
        let scored = prefilter_for_navigation(&links, &obj, &model);

        assert_eq!(scored[0].url(), "https://example.com/docs/7");
        assert_eq!(scored[0].score, 7.0);
        assert_eq!(scored[0].priority, Priority::Medium);
        assert_eq!(scored[0].historical_average, 9.0);
        assert_eq!(scored[1].historical_average, 5.0);
    }

    #[test]
    fn test_prefilter_window_and_cap() {
        let obj = objective("docs");
        let model = SiteModel::new();
        let mut links: Vec<UrlCandidate> = (0..30)
            .map(|i| UrlCandidate::new(format!("https://example.com/p{i}")).with_anchor("Page"))
            .collect();
        links.push(
            UrlCandidate::new("https://example.com/late")
                .with_anchor("Late")
                .in_main()
                .prominent(),
        );

        let scored = prefilter_for_navigation(&links, &obj, &model);
        assert_eq!(scored.len(), NAVIGATION_CANDIDATES);
        assert!(scored.iter().all(|s| s.url() != "https://example.com/late"));
    }

    #[test]
    fn test_heuristic_next_hops() {
        let obj = objective("docs");
        let model = SiteModel::new();
        let links = vec![
            UrlCandidate::new("https://example.com/a").with_anchor("A").in_main(),
            UrlCandidate::new("https://example.com/b").with_anchor("B"),
        ];
        let scored = prefilter_for_navigation(&links, &obj, &model);

        assert_eq!(
            select_heuristic_next_hops(&scored, 5.0, 5),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(
            select_heuristic_next_hops(&scored, 6.0, 5),
            vec!["https://example.com/a"]
        );
    }

    fn arb_candidate() -> impl Strategy<Value = UrlCandidate> {
        (
            "[a-z0-9/]{0,40}",
            "[a-zA-Z ]{0,30}",
            "[a-zA-Z ]{0,60}",
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(path, anchor, context, nav, main, prominent)| UrlCandidate {
                url: format!("https://example.com/{path}"),
                anchor_text: anchor,
                context,
                title: None,
                aria_label: None,
                in_nav: nav,
                in_main: main,
                is_prominent: prominent,
            })
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded_and_deterministic(candidate in arb_candidate(), text in "[a-z ]{0,40}") {
            let obj = objective(&text);
            let first = score_link(&candidate, &obj);
            prop_assert!((0.0..=10.0).contains(&first));
            prop_assert_eq!(first, score_link(&candidate, &obj));
        }

        #[test]
        fn prop_recon_selection_respects_caps(
            links in proptest::collection::vec(arb_candidate(), 0..40),
            count in 1usize..10,
            per_pattern in 1usize..4,
        ) {
            let obj = objective("documentation guides");
            let selected = select_top_links_for_recon(&links, &obj, count, per_pattern);
            prop_assert!(selected.len() <= count);

            let mut counts: HashMap<String, usize> = HashMap::new();
            for link in &selected {
                *counts.entry(link.pattern()).or_default() += 1;
            }
            prop_assert!(counts.values().all(|&c| c <= per_pattern));
        }
    }
}
