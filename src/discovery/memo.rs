use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CrawlError;
use crate::fetcher::{ContentKind, PageFetcher};

/// Fetch front for a single crawl: each distinct URL hits the network once,
/// and every request races the run's cancellation token.
#[derive(Clone)]
pub struct RunFetcher {
    inner: Arc<dyn PageFetcher>,
    memo: Arc<Mutex<HashMap<(ContentKind, String), Option<String>>>>,
    cancel: CancellationToken,
}

impl RunFetcher {
    pub fn new(inner: Arc<dyn PageFetcher>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            memo: Arc::default(),
            cancel,
        }
    }

    pub async fn get(&self, url: &str, kind: ContentKind) -> Result<Option<String>, CrawlError> {
        if self.cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        let key = (kind, url.to_string());
        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }

        let body = tokio::select! {
            _ = self.cancel.cancelled() => return Err(CrawlError::Cancelled),
            body = self.inner.fetch(url, kind) => body,
        };
        debug!(url, ok = body.is_some(), "fetched");
        self.lock().insert(key, body.clone());
        Ok(body)
    }

    pub async fn html(&self, url: &str) -> Result<Option<String>, CrawlError> {
        self.get(url, ContentKind::Html).await
    }

    /// Distinct URLs requested so far.
    pub fn fetched(&self) -> usize {
        self.lock().len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(ContentKind, String), Option<String>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ──
