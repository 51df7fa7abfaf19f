use crate::error::CrawlError;
use crate::fetch::SourceFetcher;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder title for pages that cannot be resolved.
pub const UNTITLED: &str = "Untitled";

/// Total attempts per page, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Resolves a page URL to a displayable title. Infallible by contract: a
/// page that cannot be fetched or has no `<title>` resolves to "Untitled".
#[derive(Debug, Clone)]
pub struct TitleResolver {
    fetcher: SourceFetcher,
    max_attempts: u32,
    backoff_base: Duration,
}

impl TitleResolver {
    pub fn new() -> Self {
        Self::with_fetcher(SourceFetcher::new())
    }

    pub fn with_fetcher(fetcher: SourceFetcher) -> Self {
        Self {
            fetcher,
            max_attempts: MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Shrink the backoff unit, for tests.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Resolve the page's title. Rate-limited responses are retried with
    /// exponential backoff (`base * 2^attempt`); anything else, or running
    /// out of attempts, degrades to the placeholder.
    pub async fn resolve(&self, url: &str) -> String {
        for attempt in 0..self.max_attempts {
            match self.fetcher.get_text(url).await {
                Ok(html) => {
                    return extract_title(&html).unwrap_or_else(|| UNTITLED.to_string());
                }
                Err(e) if is_rate_limited(&e) && attempt + 1 < self.max_attempts => {
                    let backoff = self.backoff_base * 2u32.pow(attempt);
                    debug!(
                        "Rate limited fetching title for {} (attempt {}), backing off {:?}",
                        url,
                        attempt + 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!("Could not resolve title for {}: {}", url, e);
                    break;
                }
            }
        }
        UNTITLED.to_string()
    }
}

impl Default for TitleResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_rate_limited(error: &CrawlError) -> bool {
    matches!(error, CrawlError::HttpError(e) if e.status() == Some(StatusCode::TOO_MANY_REQUESTS))
}

/// Trimmed text of the document's `<title>` element, if it has one.
fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").expect("static selector is valid");

    let title: String = document.select(&selector).next()?.text().collect();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
