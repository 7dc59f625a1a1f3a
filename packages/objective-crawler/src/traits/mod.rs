//! Collaborator seams.
//!
//! The crawler owns the crawl; fetching pages and answering prompts are
//! supplied by implementations of these traits.

pub mod fetcher;
pub mod oracle;
