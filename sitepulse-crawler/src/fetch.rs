use crate::error::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Best-effort single-shot fetcher for sitemap documents, robots.txt and
/// HTML pages. Retry policy lives with the callers, not here.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("Sitepulse/0.2 (https://github.com/trapdoorsec/sitepulse)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs / 2 + 1))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch a resource and return its body as text. Non-2xx responses are
    /// errors; the status stays inspectable on the returned `reqwest::Error`.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}
