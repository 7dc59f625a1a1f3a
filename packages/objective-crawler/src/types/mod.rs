//! Domain types for objective-driven crawling.

pub mod config;
pub mod extraction;
pub mod link;
pub mod objective;
pub mod page;
pub mod site_model;

pub use config::{CrawlConfig, ExtractionPolicy, NavigationPolicy, RelevanceThresholds};
pub use extraction::{
    ExtractionMethod, ExtractionResult, KeyContent, SectionAnalysis, SiteStrategy, StrategyKind,
};
pub use link::{url_pattern, Priority, ScoredLink, UrlCandidate};
pub use objective::{CrawlObjective, ObjectiveAnalysis};
pub use page::{FetchedPage, PageSection, VisitedPage};
pub use site_model::{PatternObservation, SiteModel};
