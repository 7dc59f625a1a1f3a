//! Plain HTTP fetcher: reqwest for transport, scraper for metadata, htmd for
//! markdown.
//!
//! No JavaScript rendering, so script-built pages come back mostly empty.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::Html;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::html;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::FetchedPage;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self { client })
    }

    /// Convert HTML to markdown, falling back to plain text.
    fn html_to_markdown(raw: &str) -> String {
        htmd::convert(raw).unwrap_or_else(|_| {
            let document = Html::parse_document(raw);
            document.root_element().text().collect::<String>()
        })
    }

    /// Build a page from a response body. Parsing happens in one synchronous
    /// step so the DOM never crosses an await.
    fn build_page(url: &str, final_url: String, status_code: u16, body: String) -> FetchedPage {
        let (title, description, link_count) = {
            let document = Html::parse_document(&body);
            (
                html::extract_title(&document),
                html::extract_description(&document),
                html::count_links(&document),
            )
        };

        FetchedPage {
            url: url.to_string(),
            final_url,
            markdown: Self::html_to_markdown(&body),
            html: body,
            title,
            description,
            link_count,
            status_code,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        debug!(url = %url, bytes = body.len(), "Fetched page");
        Ok(Self::build_page(url, final_url, status.as_u16(), body))
    }
}
