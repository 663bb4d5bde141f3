use thiserror::Error;

/// Conditions that abort a whole crawl. Everything else degrades in place.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid page URL: {0}")]
    InvalidOrigin(String),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Background fetch task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CrawlError {
    fn from(e: tokio::task::JoinError) -> Self {
        CrawlError::Task(e.to_string())
    }
}

// ── Tests ──
