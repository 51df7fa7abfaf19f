use crate::pagespeed::{PageSpeedConfig, PageSpeedEngine};
use crate::session::AuditSession;
use sitepulse_crawler::error::Result;
use sitepulse_crawler::{
    CategorizedPages, CrawlError, SitemapExpander, SourceFetcher, TitleResolver, discover_sitemaps,
};
use tokio::task::JoinHandle;
use tracing::info;
use url::Url;

/// Options for configuring an audit run.
pub struct AuditOptions {
    pub base_url: String,
    /// Sitemap expansion batch size.
    pub batch_size: usize,
    /// PageSpeed collection settings; `None` skips metrics entirely.
    pub pagespeed: Option<PageSpeedConfig>,
}

impl AuditOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            batch_size: sitepulse_crawler::sitemap::SITEMAP_BATCH_SIZE,
            pagespeed: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_pagespeed(mut self, config: PageSpeedConfig) -> Self {
        self.pagespeed = Some(config);
        self
    }
}

/// What an audit hands back: the synchronous categorized result, plus the
/// handle of the background metrics job when one was launched.
#[derive(Debug)]
pub struct AuditOutcome {
    pub pages: CategorizedPages,
    pub metrics_job: Option<JoinHandle<()>>,
}

/// Run a full audit: discover the site's sitemaps, expand them into a
/// categorized page map with titles, then launch PageSpeed collection in
/// the background. Returns as soon as categorization finishes; metrics
/// stream to the session as they complete.
pub async fn execute_audit(options: AuditOptions, session: &AuditSession) -> Result<AuditOutcome> {
    let base_url = options.base_url.trim_end_matches('/').to_string();
    Url::parse(&base_url).map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    let fetcher = SourceFetcher::new();

    let candidates = discover_sitemaps(&fetcher, &base_url).await?;
    info!(
        "Discovered {} sitemap candidate(s) for {}",
        candidates.len(),
        base_url
    );

    let expander = SitemapExpander::new(fetcher.clone(), TitleResolver::with_fetcher(fetcher))
        .with_batch_size(options.batch_size);
    let pages = expander.expand(&candidates, &base_url).await;

    if pages.is_empty() {
        return Err(CrawlError::NoSitemapFound(base_url));
    }

    info!(
        "Categorized {} pages into {} categories",
        pages.page_count(),
        pages.category_count()
    );

    let metrics_job = options.pagespeed.map(|config| {
        let engine = PageSpeedEngine::new(config);
        engine.spawn(&pages, session)
    });

    Ok(AuditOutcome { pages, metrics_job })
}
