use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sitemap document location discovered for a site, before expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapCandidate {
    pub url: String,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<String>,
}

impl SitemapCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(url: impl Into<String>, last_modified: Option<String>) -> Self {
        Self {
            url: url.into(),
            last_modified,
        }
    }
}

/// One page pulled out of a sitemap document. `title` is `None` only for
/// nested sitemap URLs parked in the catch-all bucket; real pages always
/// carry a resolved (possibly placeholder) title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub url: String,
    pub title: Option<String>,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<String>,
    pub category: String,
}

/// Ordered mapping from category name to the pages assigned to it.
///
/// Category keys are deterministic (BTreeMap order) and entries keep the
/// order in which the sitemaps produced them. Owned by a single audit; never
/// shared across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedPages {
    categories: BTreeMap<String, Vec<PageEntry>>,
}

impl CategorizedPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PageEntry) {
        self.categories
            .entry(entry.category.clone())
            .or_default()
            .push(entry);
    }

    pub fn get(&self, category: &str) -> Option<&[PageEntry]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &Vec<PageEntry>)> {
        self.categories.iter()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &String> {
        self.categories.keys()
    }

    /// Every entry across all categories, in category order.
    pub fn entries(&self) -> impl Iterator<Item = &PageEntry> {
        self.categories.values().flatten()
    }

    /// Unique page URLs eligible for metrics collection. Nested sitemap
    /// entries (no title) are documents, not pages, and are skipped.
    pub fn page_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entries()
            .filter(|e| e.title.is_some())
            .filter(|e| seen.insert(e.url.clone()))
            .map(|e| e.url.clone())
            .collect()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn page_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
