pub mod category;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod result;
pub mod sitemap;
pub mod title;

pub use category::{CATCH_ALL_CATEGORY, categorize};
pub use discovery::discover_sitemaps;
pub use error::CrawlError;
pub use fetch::SourceFetcher;
pub use result::{CategorizedPages, PageEntry, SitemapCandidate};
pub use sitemap::SitemapExpander;
pub use title::TitleResolver;
