use thiserror::Error;

/// Failures that abort a whole crawl, or that a caller of the report store sees.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeedUrl { url: String, reason: String },

    #[error("failed to start crawl: {0}")]
    ClientSetup(#[source] reqwest::Error),

    #[error("no crawl report available")]
    NoReportAvailable,
}

impl CrawlError {
    pub fn invalid_seed(url: &str, reason: impl Into<String>) -> Self {
        CrawlError::InvalidSeedUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-URL failures. These are logged and folded into the page record.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
}

impl PageError {
    /// HTTP status carried by the underlying error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PageError::Fetch(err) | PageError::Body(err) => err.status().map(|s| s.as_u16()),
        }
    }
}
