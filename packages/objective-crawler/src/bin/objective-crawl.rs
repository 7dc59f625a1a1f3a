//! Objective-driven crawl CLI
//!
//! Crawls one site toward an objective and writes the JSON report to a file
//! or stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use objective_crawler::fetchers::HttpFetcher;
use objective_crawler::oracle::{OllamaOracle, OpenAiOracle};
use objective_crawler::types::config::{DEFAULT_MODEL, MAX_CONCURRENCY};
use objective_crawler::{
    CrawlConfig, CrawlReport, ExtractionPolicy, NavigationPolicy, ObjectiveCrawler, Oracle,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Ollama,
    Openai,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Navigation {
    Heuristic,
    Ai,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Extraction {
    WholePage,
    Sections,
}

#[derive(Parser)]
#[command(name = "objective-crawl")]
#[command(about = "Crawl a website toward a free-text objective")]
struct Cli {
    /// Start URL; https:// is assumed when no scheme is given
    #[arg(long)]
    url: String,

    /// What to look for on the site
    #[arg(long, default_value = "")]
    objective: String,

    /// Maximum URLs to visit, failures included
    #[arg(long, default_value_t = 50)]
    max_pages: usize,

    /// Concurrent page tasks (clamped to 1..=10)
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    #[arg(long, env = "DECISION_MODEL", default_value = DEFAULT_MODEL)]
    decision_model: String,

    #[arg(long, env = "EXTRACTION_MODEL", default_value = DEFAULT_MODEL)]
    extraction_model: String,

    #[arg(long, value_enum, default_value_t = Backend::Ollama)]
    backend: Backend,

    #[arg(long, env = "OLLAMA_HOST")]
    ollama_url: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, default_value_t = 60)]
    oracle_timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = Navigation::Ai)]
    navigation: Navigation,

    #[arg(long, value_enum, default_value_t = Extraction::Sections)]
    extraction: Extraction,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> CrawlConfig {
        CrawlConfig::new(with_scheme(&self.url), self.objective.as_str())
            .with_max_pages(self.max_pages)
            .with_concurrency(self.concurrency.clamp(1, MAX_CONCURRENCY))
            .with_decision_model(self.decision_model.as_str())
            .with_extraction_model(self.extraction_model.as_str())
            .with_oracle_timeout(Duration::from_secs(self.oracle_timeout_secs))
            .with_navigation(match self.navigation {
                Navigation::Heuristic => NavigationPolicy::Heuristic,
                Navigation::Ai => NavigationPolicy::AiGuided,
            })
            .with_extraction(match self.extraction {
                Extraction::WholePage => ExtractionPolicy::WholePage,
                Extraction::Sections => ExtractionPolicy::SectionAware,
            })
    }
}

fn with_scheme(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

async fn crawl<O: Oracle>(oracle: O, config: CrawlConfig) -> Result<CrawlReport> {
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let crawler = ObjectiveCrawler::new(fetcher, oracle, config);
    crawler.run().await.context("Invalid crawl configuration")
}

fn print_summary(report: &CrawlReport) {
    let buckets = report.relevance_buckets();
    eprintln!();
    eprintln!("Crawl complete: {}", report.objective.text);
    eprintln!("  Pages crawled:      {}", report.pages.len());
    eprintln!("  URLs visited:       {}", report.urls_visited);
    eprintln!("  High-value pages:   {}", report.high_value_pages());
    eprintln!("  Avg relevance:      {:.1}/10", report.average_relevance());
    eprintln!("  High (7-10):        {}", buckets.high);
    eprintln!("  Moderate (4-6):     {}", buckets.moderate);
    eprintln!("  Low (0-3):          {}", buckets.low);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,objective_crawler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let report = match cli.backend {
        Backend::Ollama => {
            let mut oracle = OllamaOracle::new();
            if let Some(url) = &cli.ollama_url {
                oracle = oracle.with_base_url(url.as_str());
            }
            tracing::info!(base_url = oracle.base_url(), "Using Ollama backend");
            crawl(oracle, config).await?
        }
        Backend::Openai => {
            let mut oracle =
                OpenAiOracle::from_env().context("OPENAI_API_KEY must be set for --backend openai")?;
            if let Some(url) = &cli.openai_base_url {
                oracle = oracle.with_base_url(url.as_str());
            }
            crawl(oracle, config).await?
        }
    };

    print_summary(&report);

    let json = report.to_json().context("Failed to serialize report")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("  Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
