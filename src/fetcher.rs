use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = concat!("legal-scout/", env!("CARGO_PKG_VERSION"));

/// What a caller is prepared to accept back from a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    /// Sitemaps only.
    Xml,
}

impl ContentKind {
    pub fn accepts(self, content_type: &str) -> bool {
        let ct = content_type.to_ascii_lowercase();
        match self {
            ContentKind::Html => ct.contains("text/html") || ct.contains("application/xhtml+xml"),
            ContentKind::Xml => ct.contains("xml"),
        }
    }
}

/// Outbound GET. Refusals (non-2xx, wrong content type, transport errors)
/// come back as `None`; implementations never error. With
/// `ContentKind::Html`, PDFs and other binaries are refused.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, kind: ContentKind) -> Option<String>;
}

/// reqwest-backed fetcher: no cookie store, bounded redirects, per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.5"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_once(&self, url: &str, kind: ContentKind) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "request failed");
                return Attempt::Refused;
            }
        };

        let status = response.status();
        if is_retryable(status) {
            return Attempt::Retry(status);
        }
        if !status.is_success() {
            debug!(url, %status, "non-success status");
            return Attempt::Refused;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !kind.accepts(content_type) {
            debug!(url, content_type, "unwanted content type");
            return Attempt::Refused;
        }

        match response.text().await {
            Ok(body) => Attempt::Body(body),
            Err(e) => {
                debug!(url, error = %e, "failed to read body");
                Attempt::Refused
            }
        }
    }
}

enum Attempt {
    Body(String),
    Retry(StatusCode),
    Refused,
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, kind: ContentKind) -> Option<String> {
        for attempt in 0..=MAX_RETRIES {
            match self.fetch_once(url, kind).await {
                Attempt::Body(body) => return Some(body),
                Attempt::Refused => return None,
                Attempt::Retry(status) if attempt < MAX_RETRIES => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "HTTP {} on {} (attempt {}/{}), backing off {:.1}s",
                        status,
                        url,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Attempt::Retry(status) => {
                    debug!(url, %status, "giving up after retries");
                    return None;
                }
            }
        }
        None
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve one canned response per connection on a loopback port. Returns
    /// the base URL and a counter of requests received.
    async fn serve(status: &'static str, content_type: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn html_gate() {
        assert!(ContentKind::Html.accepts("text/html; charset=utf-8"));
        assert!(ContentKind::Html.accepts("TEXT/HTML"));
        assert!(ContentKind::Html.accepts("application/xhtml+xml"));
        assert!(!ContentKind::Html.accepts("application/pdf"));
        assert!(!ContentKind::Html.accepts("application/json"));
        assert!(!ContentKind::Html.accepts(""));
    }

    #[test]
    fn xml_gate() {
        assert!(ContentKind::Xml.accepts("application/xml"));
        assert!(ContentKind::Xml.accepts("text/xml; charset=UTF-8"));
        assert!(!ContentKind::Xml.accepts("text/html"));
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::OK));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_refusal() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500)).unwrap();
        // reserved TLD, never resolves
        assert!(fetcher
            .fetch("http://scout.invalid/privacy", ContentKind::Html)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn html_page_is_returned() {
        let body = "<html><title>Privacy</title><body>We collect data.</body></html>";
        let (base, hits) = serve("200 OK", "text/html; charset=utf-8", body).await;
        let page = fetcher().fetch(&format!("{}/privacy", base), ContentKind::Html).await;
        assert_eq!(page.as_deref(), Some(body));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_a_refusal() {
        let (base, hits) = serve("404 Not Found", "text/html", "<h1>missing</h1>").await;
        assert!(fetcher().fetch(&format!("{}/terms", base), ContentKind::Html).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1, "a 404 is not retried");
    }

    #[tokio::test]
    async fn pdf_is_refused_for_html() {
        let (base, _) = serve("200 OK", "application/pdf", "%PDF-1.4").await;
        assert!(fetcher().fetch(&format!("{}/terms.pdf", base), ContentKind::Html).await.is_none());
    }

    #[tokio::test]
    async fn xml_kind_accepts_sitemaps_only() {
        let xml = "<urlset></urlset>";
        let (base, _) = serve("200 OK", "application/xml", xml).await;
        let url = format!("{}/sitemap.xml", base);
        assert_eq!(fetcher().fetch(&url, ContentKind::Xml).await.as_deref(), Some(xml));
        assert!(fetcher().fetch(&url, ContentKind::Html).await.is_none());
    }

    #[tokio::test]
    async fn unavailable_is_retried_then_refused() {
        let (base, hits) = serve("503 Service Unavailable", "text/html", "busy").await;
        assert!(fetcher().fetch(&format!("{}/privacy", base), ContentKind::Html).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RETRIES as usize + 1);
    }
}
