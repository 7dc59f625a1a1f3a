//! Oracle prompts.
//!
//! Each prompt names the exact JSON shape it expects back; the parsers in
//! [`super::parse`] read those keys and default whatever is missing.

use serde_json::json;

use crate::html::truncate_chars;
use crate::types::{
    link::ScoredLink,
    objective::CrawlObjective,
    page::{PageSection, VisitedPage},
};

/// Characters of page content sent for whole-page extraction.
pub const PAGE_CONTENT_LIMIT: usize = 4000;

/// Headers listed in the whole-page prompt.
const PROMPT_HEADER_LIMIT: usize = 15;

/// Section preview characters sent per section.
const SECTION_PREVIEW_LIMIT: usize = 200;

/// Anchor characters shown per navigation candidate.
const ANCHOR_LIMIT: usize = 50;

/// Learned patterns shown in the navigation prompt.
const PATTERN_LIMIT: usize = 5;

/// Pages listed in the structure-analysis prompt.
const STRUCTURE_PAGE_LIMIT: usize = 10;

/// Prompt for turning a free-text objective into a crawl plan.
pub const OBJECTIVE_ANALYSIS_PROMPT: &str = r#"You are planning a web crawl. Work out what the user is after and how a crawler should find it.

USER'S OBJECTIVE: "{objective}"

Determine:
1. The kinds of data wanted (products, articles, contact details, documentation, ...)
2. The fields or attributes worth extracting
3. The parts of a website most likely to hold them
4. URL fragments that point towards relevant pages
5. URL fragments that point away from them

Output JSON:
{
  "data_types": ["primary type", "secondary type"],
  "key_fields": ["field1", "field2", "field3"],
  "valuable_sections": ["section1", "section2"],
  "url_patterns_to_seek": ["pattern1", "pattern2"],
  "url_patterns_to_avoid": ["pattern1", "pattern2"],
  "extraction_strategy": "How to approach extraction",
  "success_criteria": "How to tell when enough has been gathered"
}

Be specific and actionable."#;

/// Prompt for choosing the next hops from pre-scored candidates.
pub const NAVIGATION_PROMPT: &str = r#"You are steering a web crawler. Pick the best pre-scored links to visit next.

CRAWL OBJECTIVE: {objective}

PROGRESS:
- Pages crawled: {visited}/{max_pages}
- High-value pages: {high_value}
- Current phase: {phase}

CURRENT PAGE: {current_url}
Page type: {page_type}
Relevance: {relevance}/10
Summary: {summary}

LEARNED PATTERNS:
High-value URL patterns: {patterns}

CANDIDATE LINKS ([pre-score] anchor → path):
{candidates}

Choose 3-5 links that best serve the objective. Favour links that match learned
high-value patterns, carry high pre-scores, or open up unexplored areas.

Reply with ONLY the numbers, comma-separated (for example "1,3,5").
If nothing is worth visiting, reply "NONE"."#;

/// Prompt for summarizing reconnaissance into a deep-crawl strategy.
pub const STRUCTURE_ANALYSIS_PROMPT: &str = r#"Review the reconnaissance results of a web crawl and recommend a strategy.

CRAWL OBJECTIVE: {objective}

PAGES VISITED DURING RECONNAISSANCE ({page_count} pages):
{pages}

PAGE TYPE DISTRIBUTION:
{distribution}

HIGH-VALUE URL PATTERNS DISCOVERED:
{patterns}

Answer:
1. What kind of website is this?
2. Which page types matter most for the objective?
3. Which URL patterns should the deep crawl prioritize?
4. Should the crawl continue as planned?

Output JSON:
{
  "site_type": "...",
  "most_valuable_page_types": ["type1", "type2"],
  "recommended_focus": "Where to focus",
  "high_priority_patterns": ["/pattern/*"],
  "strategy": "continue_deep | adjust_objective | site_not_suitable"
}"#;

/// Prompt for scoring and extracting a page section by section.
pub const SECTION_EXTRACTION_PROMPT: &str = r#"You are reading a web page SECTION BY SECTION to find content that serves an objective.

USER'S OBJECTIVE: {objective}

TARGET DATA TYPES: {data_types}
KEY FIELDS TO EXTRACT: {key_fields}

PAGE URL: {url}

PAGE SECTIONS (judge each on its own):
{sections}

For every section:
1. Score it 0-10 for how well it matches the objective
2. Sections scoring 7+: extract all relevant data in detail
3. Sections scoring 4-6: extract the key points
4. Sections scoring 0-3: say why and extract nothing

Output JSON:
{
  "page_type": "overall page type",
  "sections_analysis": [
    {
      "section_id": 0,
      "relevance_score": 0,
      "reason": "why this section does or does not matter",
      "extracted_content": {}
    }
  ],
  "content_summary": "What valuable information the page holds"
}

Sections on the same page can differ wildly in relevance. Score them precisely."#;

/// Prompt for scoring and extracting a page as a whole.
pub const WHOLE_PAGE_EXTRACTION_PROMPT: &str = r#"You are judging a web page against an objective and extracting what matters.

USER'S OBJECTIVE: {objective}

TARGET DATA TYPES: {data_types}
KEY FIELDS TO EXTRACT: {key_fields}

PAGE URL: {url}

PAGE HEADERS:
{headers}

PAGE CONTENT (excerpt):
{content}

Relevance scale (0-10):
- 9-10: answers the objective directly with specific detail
- 7-8: substantial relevant information
- 5-6: some useful related information
- 3-4: tangential or background only
- 1-2: barely related
- 0: unrelated (navigation, boilerplate, off-topic)

Extract everything for 7+, key points for 4-6, only the relevant fragments below that.

Output JSON:
{
  "page_type": "...",
  "relevance_score": 0,
  "key_content": {},
  "reasoning": "Why the page got this score",
  "content_summary": "What useful information is on the page"
}

Be accurate with relevance scores."#;

pub fn format_objective_prompt(objective: &str) -> String {
    OBJECTIVE_ANALYSIS_PROMPT.replace("{objective}", objective)
}

/// Crawl progress shown to the navigator.
#[derive(Debug, Clone, Copy)]
pub struct NavigationProgress<'a> {
    pub visited: usize,
    pub max_pages: usize,
    pub high_value_pages: usize,
    pub phase: &'a str,
}

/// Render candidates as a 1-based numbered list.
pub fn format_candidate_list(candidates: &[ScoredLink]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, link)| {
            format!(
                "{}. [{:.1}] {} → {}",
                i + 1,
                link.score,
                truncate_chars(&link.candidate.anchor_text, ANCHOR_LIMIT),
                link.candidate.url_path()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_navigation_prompt(
    objective: &str,
    current: &VisitedPage,
    candidates: &[ScoredLink],
    learned_patterns: &[String],
    progress: NavigationProgress<'_>,
) -> String {
    let patterns = learned_patterns
        .iter()
        .take(PATTERN_LIMIT)
        .cloned()
        .collect::<Vec<_>>();

    NAVIGATION_PROMPT
        .replace("{visited}", &progress.visited.to_string())
        .replace("{max_pages}", &progress.max_pages.to_string())
        .replace("{high_value}", &progress.high_value_pages.to_string())
        .replace("{phase}", progress.phase)
        .replace("{patterns}", &format!("{patterns:?}"))
        .replace("{current_url}", &current.url)
        .replace("{page_type}", &current.page_type)
        .replace("{relevance}", &format!("{:.1}", current.relevance_score))
        .replace("{candidates}", &format_candidate_list(candidates))
        .replace("{summary}", &current.content_summary)
        .replace("{objective}", objective)
}

pub fn format_structure_prompt(
    objective: &str,
    pages: &[VisitedPage],
    high_value_patterns: &[String],
) -> String {
    let listing = pages
        .iter()
        .take(STRUCTURE_PAGE_LIMIT)
        .map(|p| {
            format!(
                "- {}: {} (relevance: {:.1}/10)",
                p.url, p.page_type, p.relevance_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut distribution = serde_json::Map::new();
    for (page_type, (count, total)) in page_type_distribution(pages) {
        distribution.insert(
            page_type,
            json!({ "count": count, "avg_relevance": total / count as f32 }),
        );
    }
    let distribution =
        serde_json::to_string_pretty(&distribution).unwrap_or_else(|_| "{}".to_string());

    STRUCTURE_ANALYSIS_PROMPT
        .replace("{page_count}", &pages.len().to_string())
        .replace("{distribution}", &distribution)
        .replace("{patterns}", &format!("{high_value_patterns:?}"))
        .replace("{pages}", &listing)
        .replace("{objective}", objective)
}

/// Page types in first-seen order with `(count, relevance total)`.
pub fn page_type_distribution(pages: &[VisitedPage]) -> Vec<(String, (usize, f32))> {
    let mut buckets: indexmap::IndexMap<String, (usize, f32)> = indexmap::IndexMap::new();
    for page in pages {
        let entry = buckets.entry(page.page_type.clone()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += page.relevance_score;
    }
    buckets.into_iter().collect()
}

pub fn format_section_prompt(
    objective: &CrawlObjective,
    url: &str,
    sections: &[PageSection],
) -> String {
    let summaries: Vec<serde_json::Value> = sections
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "headers": s.headers,
                "preview": truncate_chars(&s.text_preview, SECTION_PREVIEW_LIMIT),
                "size": format!("{} words", s.word_count),
            })
        })
        .collect();
    let sections_json =
        serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string());

    SECTION_EXTRACTION_PROMPT
        .replace("{data_types}", &objective.analysis.data_types.join(", "))
        .replace("{key_fields}", &objective.analysis.key_fields.join(", "))
        .replace("{url}", url)
        .replace("{sections}", &sections_json)
        .replace("{objective}", &objective.text)
}

pub fn format_whole_page_prompt(
    objective: &CrawlObjective,
    url: &str,
    headers: &[String],
    content: &str,
) -> String {
    let headers = headers
        .iter()
        .take(PROMPT_HEADER_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    WHOLE_PAGE_EXTRACTION_PROMPT
        .replace("{data_types}", &objective.analysis.data_types.join(", "))
        .replace("{key_fields}", &objective.analysis.key_fields.join(", "))
        .replace("{url}", url)
        .replace("{objective}", &objective.text)
        .replace("{headers}", &headers)
        .replace("{content}", &truncate_chars(content, PAGE_CONTENT_LIMIT))
}
