use crate::category::{CATCH_ALL_CATEGORY, categorize};
use crate::error::Result;
use crate::fetch::SourceFetcher;
use crate::result::{CategorizedPages, PageEntry, SitemapCandidate};
use crate::title::TitleResolver;
use futures::future::join_all;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

/// How many sitemap documents are expanded concurrently. Also bounds the
/// title fetches in flight, since titles are only resolved for the batch
/// currently being expanded.
pub const SITEMAP_BATCH_SIZE: usize = 5;

/// One `<url>` or `<sitemap>` entry from a sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

/// Parsed sitemap document: page entries plus nested sitemap references
/// (the sitemap-of-sitemaps case).
#[derive(Debug, Clone, Default)]
pub struct SitemapDocument {
    pub pages: Vec<SitemapEntry>,
    pub nested: Vec<SitemapEntry>,
}

/// Parse a sitemap or sitemap-index document. Handles both `<urlset>` and
/// `<sitemapindex>` roots; namespaced tags are matched on local name.
pub fn parse_sitemap_document(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);

    let mut document = SitemapDocument::default();
    let mut in_url = false;
    let mut in_sitemap = false;
    let mut current_tag: Option<Vec<u8>> = None;
    let mut loc = None;
    let mut lastmod = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    loc = None;
                    lastmod = None;
                }
                b"sitemap" => {
                    in_sitemap = true;
                    loc = None;
                    lastmod = None;
                }
                tag @ (b"loc" | b"lastmod") => current_tag = Some(tag.to_vec()),
                _ => current_tag = None,
            },
            Ok(Event::Text(t)) => {
                if in_url || in_sitemap {
                    let text = t
                        .unescape()
                        .map_err(|e| crate::error::CrawlError::ParseError(e.to_string()))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        match current_tag.as_deref() {
                            Some(b"loc") => loc = Some(text.to_string()),
                            Some(b"lastmod") => lastmod = Some(text.to_string()),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(loc) = loc.take() {
                        document.pages.push(SitemapEntry {
                            loc,
                            lastmod: lastmod.take(),
                        });
                    }
                    in_url = false;
                }
                b"sitemap" => {
                    if let Some(loc) = loc.take() {
                        document.nested.push(SitemapEntry {
                            loc,
                            lastmod: lastmod.take(),
                        });
                    }
                    in_sitemap = false;
                }
                _ => current_tag = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(crate::error::CrawlError::ParseError(e.to_string()));
            }
            _ => {}
        }
    }

    Ok(document)
}

/// Expands sitemap candidates into a categorized page map, resolving page
/// titles along the way.
pub struct SitemapExpander {
    fetcher: SourceFetcher,
    resolver: TitleResolver,
    batch_size: usize,
}

impl SitemapExpander {
    pub fn new(fetcher: SourceFetcher, resolver: TitleResolver) -> Self {
        Self {
            fetcher,
            resolver,
            batch_size: SITEMAP_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Expand all candidates into a categorized result. Candidates are
    /// processed in fixed-size batches; a batch fully settles (sitemap
    /// fetches and title fetches alike) before the next one starts, which
    /// bounds the pressure on the crawled site. A candidate that fails to
    /// fetch or parse is skipped, never fatal.
    pub async fn expand(&self, candidates: &[SitemapCandidate], base_url: &str) -> CategorizedPages {
        let mut pages = CategorizedPages::new();

        for batch in candidates.chunks(self.batch_size) {
            let expanded = join_all(
                batch
                    .iter()
                    .map(|candidate| self.expand_candidate(candidate, base_url)),
            )
            .await;

            for entries in expanded {
                for entry in entries {
                    pages.push(entry);
                }
            }
        }

        pages
    }

    async fn expand_candidate(
        &self,
        candidate: &SitemapCandidate,
        base_url: &str,
    ) -> Vec<PageEntry> {
        let xml = match self.fetcher.get_text(&candidate.url).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!("Skipping sitemap {}: {}", candidate.url, e);
                return Vec::new();
            }
        };

        let document = match parse_sitemap_document(&xml) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping unparseable sitemap {}: {}", candidate.url, e);
                return Vec::new();
            }
        };

        debug!(
            "Sitemap {} yielded {} pages, {} nested sitemaps",
            candidate.url,
            document.pages.len(),
            document.nested.len()
        );

        let titles = join_all(
            document
                .pages
                .iter()
                .map(|page| self.resolver.resolve(&page.loc)),
        )
        .await;

        let mut entries: Vec<PageEntry> = document
            .pages
            .into_iter()
            .zip(titles)
            .map(|(page, title)| PageEntry {
                category: categorize(&page.loc, base_url),
                url: page.loc,
                title: Some(title),
                last_modified: page.lastmod,
            })
            .collect();

        // Nested sitemaps are not recursed into; they are parked in the
        // catch-all bucket without a title.
        entries.extend(document.nested.into_iter().map(|nested| PageEntry {
            url: nested.loc,
            title: None,
            last_modified: nested.lastmod,
            category: CATCH_ALL_CATEGORY.to_string(),
        }));

        entries
    }
}
