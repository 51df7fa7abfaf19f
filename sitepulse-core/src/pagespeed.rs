//! PageSpeed Insights provider client and the per-URL metrics job engine.

use crate::session::{AuditSession, PageSpeedEvent};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sitepulse_crawler::CategorizedPages;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Public analysis page for a scored URL.
const ANALYSIS_BASE_URL: &str = "https://developers.google.com/speed/pagespeed/insights/";

/// Default provider endpoint.
pub const PAGESPEED_API_URL: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Device profile scored independently by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Desktop,
    Mobile,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Desktop => "desktop",
            Strategy::Mobile => "mobile",
        }
    }
}

/// Lighthouse category scores for one device profile, each in [0, 1] or
/// absent when the provider omitted the category (or the fetch failed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub performance: Option<f64>,
    pub accessibility: Option<f64>,
    #[serde(rename = "bestPractices")]
    pub best_practices: Option<f64>,
    pub seo: Option<f64>,
}

impl ScoreSet {
    pub fn is_empty(&self) -> bool {
        self.performance.is_none()
            && self.accessibility.is_none()
            && self.best_practices.is_none()
            && self.seo.is_none()
    }
}

/// Combined desktop + mobile result for one page. Immutable once built;
/// emitted to the session and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpeedResult {
    #[serde(rename = "siteUrl")]
    pub site_url: String,
    pub desktop: ScoreSet,
    pub mobile: ScoreSet,
    #[serde(rename = "analysisUrl")]
    pub analysis_url: String,
}

impl PageSpeedResult {
    /// A result is worth emitting when at least one profile produced a
    /// performance score. Other categories alone do not count.
    pub fn has_usable_score(&self) -> bool {
        self.desktop.performance.is_some() || self.mobile.performance.is_some()
    }
}

// Provider response shape: lighthouseResult.categories.<name>.score.

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: ApiCategories,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCategories {
    performance: Option<ApiCategory>,
    accessibility: Option<ApiCategory>,
    #[serde(rename = "best-practices")]
    best_practices: Option<ApiCategory>,
    seo: Option<ApiCategory>,
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    score: Option<f64>,
}

impl ApiResponse {
    fn into_scores(self) -> ScoreSet {
        let categories = self
            .lighthouse_result
            .map(|result| result.categories)
            .unwrap_or_default();

        ScoreSet {
            performance: categories.performance.and_then(|c| c.score),
            accessibility: categories.accessibility.and_then(|c| c.score),
            best_practices: categories.best_practices.and_then(|c| c.score),
            seo: categories.seo.and_then(|c| c.score),
        }
    }
}

/// Tunables for the provider client and job engine.
#[derive(Debug, Clone)]
pub struct PageSpeedConfig {
    pub api_url: String,
    pub api_key: String,
    /// Imposed before every provider call, including the first, to stay
    /// under the per-key rate ceiling.
    pub request_delay: Duration,
    /// Unit for the exponential backoff (`backoff_base * 2^attempt`).
    pub backoff_base: Duration,
    /// Attempts per device-profile call.
    pub max_attempts: u32,
    /// Outer rounds per URL when neither profile yields a usable score.
    pub max_url_attempts: u32,
    /// Concurrent per-URL jobs.
    pub max_in_flight: usize,
}

impl PageSpeedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: PAGESPEED_API_URL.to_string(),
            api_key: api_key.into(),
            request_delay: Duration::from_secs(2),
            backoff_base: Duration::from_secs(1),
            max_attempts: 5,
            max_url_attempts: 5,
            max_in_flight: 4,
        }
    }
}

/// Client for the PageSpeed Insights API with bounded retry-with-backoff.
#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    client: Client,
    config: PageSpeedConfig,
}

impl PageSpeedClient {
    pub fn new(config: PageSpeedConfig) -> Self {
        let client = Client::builder()
            .user_agent("Sitepulse/0.2 (https://github.com/trapdoorsec/sitepulse)")
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn config(&self) -> &PageSpeedConfig {
        &self.config
    }

    /// Fetch desktop and mobile scores for one page. The two profile calls
    /// run concurrently and fail independently; a profile that permanently
    /// fails contributes an empty score set rather than an error.
    pub async fn fetch_page_speed(&self, url: &str, session: &AuditSession) -> PageSpeedResult {
        let (desktop, mobile) = tokio::join!(
            self.fetch_strategy(url, Strategy::Desktop, session),
            self.fetch_strategy(url, Strategy::Mobile, session),
        );

        PageSpeedResult {
            site_url: url.to_string(),
            desktop,
            mobile,
            analysis_url: analysis_url_for(url),
        }
    }

    /// One device-profile call with the retry loop: 429 and 5xx back off
    /// exponentially up to the attempt ceiling, anything else is terminal.
    /// Cancellation is checked before every sleep and every request.
    async fn fetch_strategy(
        &self,
        url: &str,
        strategy: Strategy,
        session: &AuditSession,
    ) -> ScoreSet {
        for attempt in 0..self.config.max_attempts {
            if session.is_cancelled() {
                debug!("Audit cancelled, skipping {} ({})", url, strategy.as_str());
                return ScoreSet::default();
            }

            tokio::time::sleep(self.config.request_delay).await;

            let request = self
                .client
                .get(&self.config.api_url)
                .query(&[
                    ("url", url),
                    ("key", self.config.api_key.as_str()),
                    ("category", "performance"),
                    ("category", "accessibility"),
                    ("category", "best-practices"),
                    ("category", "seo"),
                    ("strategy", strategy.as_str()),
                ]);

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "PageSpeed request for {} ({}) failed: {}",
                        url,
                        strategy.as_str(),
                        e
                    );
                    return ScoreSet::default();
                }
            };

            let status = response.status();
            if status.is_success() {
                return match response.json::<ApiResponse>().await {
                    Ok(body) => body.into_scores(),
                    Err(e) => {
                        warn!("Unreadable PageSpeed response for {}: {}", url, e);
                        ScoreSet::default()
                    }
                };
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt + 1 < self.config.max_attempts {
                    let backoff = self.config.backoff_base * 2u32.pow(attempt);
                    warn!(
                        "PageSpeed {} for {} ({}), attempt {}/{}, backing off {:?}",
                        status,
                        url,
                        strategy.as_str(),
                        attempt + 1,
                        self.config.max_attempts,
                        backoff
                    );
                    if session.is_cancelled() {
                        return ScoreSet::default();
                    }
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                warn!(
                    "PageSpeed retries exhausted for {} ({})",
                    url,
                    strategy.as_str()
                );
                return ScoreSet::default();
            }

            warn!(
                "PageSpeed {} for {} ({}), not retryable",
                status,
                url,
                strategy.as_str()
            );
            return ScoreSet::default();
        }

        ScoreSet::default()
    }
}

fn analysis_url_for(url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    format!("{}?url={}", ANALYSIS_BASE_URL, encoded)
}

/// Fans audit URLs out to a bounded pool of per-URL jobs and emits each
/// result to the session the moment it is ready.
pub struct PageSpeedEngine {
    client: Arc<PageSpeedClient>,
}

impl PageSpeedEngine {
    pub fn new(config: PageSpeedConfig) -> Self {
        Self {
            client: Arc::new(PageSpeedClient::new(config)),
        }
    }

    /// Launch the engine over a categorized result. Returns immediately;
    /// the handle resolves once every per-URL job has settled. Results are
    /// emitted in completion order, not discovery order.
    pub fn spawn(&self, pages: &CategorizedPages, session: &AuditSession) -> JoinHandle<()> {
        let urls = pages.page_urls();
        let client = Arc::clone(&self.client);
        let session = session.clone();

        tokio::spawn(async move {
            run_jobs(client, urls, session).await;
        })
    }
}

async fn run_jobs(client: Arc<PageSpeedClient>, urls: Vec<String>, session: AuditSession) {
    info!("Starting PageSpeed collection for {} URLs", urls.len());

    let semaphore = Arc::new(Semaphore::new(client.config().max_in_flight));
    let mut handles = Vec::new();

    for url in urls {
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(&client);
        let session = session.clone();

        handles.push(tokio::spawn(async move {
            // Closed only if the semaphore is dropped first, which run_jobs
            // outliving its tasks rules out.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            audit_one_url(&client, &url, &session).await;
        }));
    }

    for result in join_all(handles).await {
        if let Err(e) = result {
            warn!("PageSpeed job panicked: {}", e);
        }
    }

    info!("PageSpeed collection finished");
}

/// One URL's job: fetch both profiles, retrying the whole pair while no
/// usable performance score shows up on either. Emits on success; emits
/// nothing when every round comes back unusable.
async fn audit_one_url(client: &PageSpeedClient, url: &str, session: &AuditSession) {
    let rounds = client.config().max_url_attempts;

    for round in 0..rounds {
        if session.is_cancelled() {
            debug!("Audit cancelled, dropping PageSpeed job for {}", url);
            return;
        }

        let result = client.fetch_page_speed(url, session).await;
        if result.has_usable_score() {
            session.emit(PageSpeedEvent {
                url: url.to_string(),
                page_speed_data: result,
            });
            return;
        }

        warn!(
            "No usable performance score for {} (round {}/{})",
            url,
            round + 1,
            rounds
        );
    }

    warn!("Giving up on PageSpeed metrics for {}", url);
}
