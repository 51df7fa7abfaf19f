use crate::error::{CrawlError, Result};
use crate::fetch::SourceFetcher;
use crate::result::SitemapCandidate;
use crate::sitemap::parse_sitemap_document;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Discover the sitemap documents for a site, in priority order:
///
/// 1. `{base}/sitemap_index.xml` - if it lists any sitemaps, that list is
///    definitive and discovery stops.
/// 2. `{base}/sitemap.xml` - added as a single candidate when reachable.
/// 3. `{base}/robots.txt` - every `Sitemap:` line, checked regardless of
///    whether step 2 found anything.
/// 4. The homepage HTML - anchors whose href mentions "sitemap", but only
///    when steps 2-3 came up empty.
///
/// Individual source failures are logged and skipped. Candidates are
/// deduplicated by exact URL, keeping first-seen order. No candidates at
/// all is a `NoSitemapFound` error.
pub async fn discover_sitemaps(
    fetcher: &SourceFetcher,
    base_url: &str,
) -> Result<Vec<SitemapCandidate>> {
    let base = Url::parse(base_url)
        .map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    let base_str = base_url.trim_end_matches('/');

    // Step 1: sitemap index is the definitive source when present.
    let index_url = format!("{}/sitemap_index.xml", base_str);
    match fetcher.get_text(&index_url).await {
        Ok(xml) => match parse_sitemap_document(&xml) {
            Ok(document) if !document.nested.is_empty() => {
                info!(
                    "Found sitemap index with {} sitemaps at {}",
                    document.nested.len(),
                    index_url
                );
                return Ok(dedup_candidates(
                    document
                        .nested
                        .into_iter()
                        .map(|entry| SitemapCandidate::with_last_modified(entry.loc, entry.lastmod))
                        .collect(),
                ));
            }
            Ok(_) => debug!("Sitemap index at {} lists no sitemaps", index_url),
            Err(e) => debug!("Sitemap index at {} did not parse: {}", index_url, e),
        },
        Err(e) => debug!("No sitemap index at {}: {}", index_url, e),
    }

    let mut candidates = Vec::new();

    // Step 2: default sitemap location.
    let default_url = format!("{}/sitemap.xml", base_str);
    match fetcher.get_text(&default_url).await {
        Ok(_) => candidates.push(SitemapCandidate::new(default_url)),
        Err(e) => debug!("No default sitemap at {}: {}", default_url, e),
    }

    // Step 3: robots.txt Sitemap directives, attempted either way.
    let robots_url = format!("{}/robots.txt", base_str);
    match fetcher.get_text(&robots_url).await {
        Ok(body) => {
            for sitemap_url in sitemap_lines_from_robots(&body) {
                candidates.push(SitemapCandidate::new(sitemap_url));
            }
        }
        Err(e) => debug!("No robots.txt at {}: {}", robots_url, e),
    }

    // Step 4: last resort, scrape the homepage for sitemap-looking links.
    if candidates.is_empty() {
        match fetcher.get_text(base_url).await {
            Ok(html) => {
                for href in sitemap_links_from_html(&html, &base) {
                    candidates.push(SitemapCandidate::new(href));
                }
            }
            Err(e) => warn!("Could not scrape {} for sitemap links: {}", base_url, e),
        }
    }

    if candidates.is_empty() {
        return Err(CrawlError::NoSitemapFound(base_url.to_string()));
    }

    Ok(dedup_candidates(candidates))
}

/// Every `Sitemap: <url>` directive from a robots.txt body, case-insensitive,
/// values trimmed.
fn sitemap_lines_from_robots(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (directive, value) = line.split_once(':')?;
            if directive.trim().eq_ignore_ascii_case("sitemap") {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Anchor hrefs mentioning "sitemap", resolved against the base URL.
fn sitemap_links_from_html(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| href.contains("sitemap"))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .collect()
}

/// Dedup by exact URL string, first occurrence wins.
fn dedup_candidates(candidates: Vec<SitemapCandidate>) -> Vec<SitemapCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404)
    }

    #[tokio::test]
    async fn test_sitemap_index_is_definitive() {
        let mock_server = MockServer::start().await;

        let index = r#"<?xml version="1.0"?>
<sitemapindex>
  <sitemap><loc>https://x.com/sitemap-a.xml</loc><lastmod>2024-03-01</lastmod></sitemap>
  <sitemap><loc>https://x.com/sitemap-b.xml</loc></sitemap>
  <sitemap><loc>https://x.com/sitemap-c.xml</loc></sitemap>
</sitemapindex>"#;

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let candidates = discover_sitemaps(&fetcher, &mock_server.uri()).await.unwrap();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].url, "https://x.com/sitemap-a.xml");
        assert_eq!(candidates[0].last_modified.as_deref(), Some("2024-03-01"));
        assert_eq!(candidates[1].url, "https://x.com/sitemap-b.xml");
        assert_eq!(candidates[2].url, "https://x.com/sitemap-c.xml");
    }

    #[tokio::test]
    async fn test_falls_back_to_default_sitemap() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(not_found())
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<?xml version="1.0"?><urlset></urlset>"#),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(not_found())
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let candidates = discover_sitemaps(&fetcher, &mock_server.uri()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, format!("{}/sitemap.xml", mock_server.uri()));
        assert_eq!(candidates[0].last_modified, None);
    }

    #[tokio::test]
    async fn test_robots_txt_sitemap_lines() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(not_found())
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(not_found())
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "User-agent: *\nDisallow: /admin\nsitemap:   https://x.com/map-1.xml  \nSITEMAP: https://x.com/map-2.xml\n",
            ))
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let candidates = discover_sitemaps(&fetcher, &mock_server.uri()).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://x.com/map-1.xml");
        assert_eq!(candidates[1].url, "https://x.com/map-2.xml");
    }

    #[tokio::test]
    async fn test_default_sitemap_and_robots_combine_with_dedup() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(not_found())
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<?xml version="1.0"?><urlset></urlset>"#),
            )
            .mount(&mock_server)
            .await;
        // robots.txt repeats the default sitemap and adds one more.
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "Sitemap: {}/sitemap.xml\nSitemap: {}/extra.xml\n",
                base, base
            )))
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let candidates = discover_sitemaps(&fetcher, &base).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, format!("{}/sitemap.xml", base));
        assert_eq!(candidates[1].url, format!("{}/extra.xml", base));
    }

    #[tokio::test]
    async fn test_homepage_scrape_is_last_resort() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        for missing in ["/sitemap_index.xml", "/sitemap.xml", "/robots.txt"] {
            Mock::given(method("GET"))
                .and(path(missing))
                .respond_with(not_found())
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <a href="/about">About</a>
                    <a href="/files/sitemap-news.xml">News sitemap</a>
                </body></html>"#,
            ))
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let candidates = discover_sitemaps(&fetcher, &base).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, format!("{}/files/sitemap-news.xml", base));
    }

    #[tokio::test]
    async fn test_no_source_yields_no_sitemap_found() {
        let mock_server = MockServer::start().await;

        for missing in ["/sitemap_index.xml", "/sitemap.xml", "/robots.txt"] {
            Mock::given(method("GET"))
                .and(path(missing))
                .respond_with(not_found())
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><a href=\"/about\">About</a></body></html>"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = SourceFetcher::new();
        let err = discover_sitemaps(&fetcher, &mock_server.uri())
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::NoSitemapFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let fetcher = SourceFetcher::new();
        let err = discover_sitemaps(&fetcher, "not a url").await.unwrap_err();
        assert!(matches!(err, CrawlError::InvalidUrl(_)));
    }

    #[test]
    fn test_sitemap_lines_from_robots_parses_full_urls() {
        let body = "Sitemap: https://x.com/a.xml\nAllow: /\nSitemap:https://x.com/b.xml";
        let lines = sitemap_lines_from_robots(body);
        assert_eq!(lines, vec!["https://x.com/a.xml", "https://x.com/b.xml"]);
    }
}
