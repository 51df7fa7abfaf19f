use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Sitemap parse error: {0}")]
    ParseError(String),

    #[error("No sitemap found for {0}")]
    NoSitemapFound(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
