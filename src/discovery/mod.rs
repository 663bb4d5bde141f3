//! Finds a site's legal documents, combines them and ranks their riskiest
//! clauses.
//!
//! Phases run strictly in order; each feeds the candidate set of the next:
//!
//! 1. guess common legal paths
//! 2. scan the live page for legal links
//! 3. scan the site root
//! 4. probe internal site search, then the sitemap
//! 5. merge and sort by category
//! 6. expand siblings of the first candidates
//! 7. cap at `max_pages`
//! 8. fetch, parse and drop thin pages
//!
//! If nothing survives, the current page's own text is scanned instead.

pub mod candidates;
pub mod combine;
pub mod memo;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clauses::extract_clauses;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::fetcher::{ContentKind, PageFetcher};
use crate::html::{parse_page, scan_live_links, visible_text};
use crate::report::{CrawlReport, CrawlRequest, FetchedPage};
use crate::risk::{rank, Ranking, RiskClassifier};
use crate::sitemap::{self, SITEMAP_PATH};
use crate::urls::{self, categorize, sort_by_category_priority, to_origin, word_count, Origin, LEGAL_TOKEN_RE};

use memo::RunFetcher;

/// Phases 1-7 of a crawl: the capped candidate list.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub origin: Origin,
    pub candidates: Vec<String>,
    pub fetched: usize,
}

/// Snapshot plus candidates, kept for the later phases of a full crawl.
struct Discovered {
    origin: Origin,
    snapshot: Option<String>,
    candidates: Vec<String>,
}

pub struct LegalScout {
    fetcher: Arc<dyn PageFetcher>,
    classifier: Option<Arc<dyn RiskClassifier>>,
    config: CrawlConfig,
}

impl LegalScout {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            classifier: None,
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: Option<Arc<dyn RiskClassifier>>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run every phase. Never errors: fatal conditions come back as a
    /// `failure` report.
    pub async fn crawl(&self, request: &CrawlRequest, cancel: &CancellationToken) -> CrawlReport {
        let run = RunFetcher::new(Arc::clone(&self.fetcher), cancel.clone());
        let origin = to_origin(&request.url);

        match self.crawl_inner(request, &run).await {
            Ok(report) => report,
            Err(e) => {
                warn!(url = %request.url, error = %e, "scan failed");
                CrawlReport::failure(origin, e, run.fetched())
            }
        }
    }

    /// Phases 1-7 only.
    pub async fn discover(
        &self,
        request: &CrawlRequest,
        cancel: &CancellationToken,
    ) -> Result<Discovery, CrawlError> {
        let run = RunFetcher::new(Arc::clone(&self.fetcher), cancel.clone());
        let found = self.discover_inner(request, &run).await?;
        Ok(Discovery {
            origin: found.origin,
            candidates: found.candidates,
            fetched: run.fetched(),
        })
    }

    async fn crawl_inner(
        &self,
        request: &CrawlRequest,
        run: &RunFetcher,
    ) -> Result<CrawlReport, CrawlError> {
        let Discovered {
            origin,
            snapshot,
            candidates,
        } = self.discover_inner(request, run).await?;

        let mut pages = self.fetch_pages(&origin, &candidates, run).await?;
        info!("Kept {} of {} candidate pages", pages.len(), candidates.len());

        if pages.is_empty() {
            let text = snapshot.as_deref().map(visible_text).unwrap_or_default();
            info!(words = word_count(&text), "no legal pages found, scanning the current page");
            let clauses = extract_clauses(&text);
            let ranking = self.rank_or_cancel(&request.url, &clauses, run).await?;
            return Ok(CrawlReport::success(origin, &[], None, ranking, run.fetched()));
        }

        combine::order_pages(&mut pages);
        let (text, combined) = combine::combine(&pages);
        let clauses = extract_clauses(&text);
        debug!(clauses = clauses.len(), "extracted clause candidates");

        let lead_url = pages[0].url.clone();
        let ranking = self.rank_or_cancel(&lead_url, &clauses, run).await?;

        Ok(CrawlReport::success(origin, &pages, combined, ranking, run.fetched()))
    }

    async fn rank_or_cancel(&self, url: &str, clauses: &[String], run: &RunFetcher) -> Result<Ranking, CrawlError> {
        if run.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        tokio::select! {
            _ = run.cancelled() => Err(CrawlError::Cancelled),
            ranking = rank(self.classifier.as_deref(), url, clauses) => Ok(ranking),
        }
    }

    async fn discover_inner(
        &self,
        request: &CrawlRequest,
        run: &RunFetcher,
    ) -> Result<Discovered, CrawlError> {
        let origin =
            to_origin(&request.url).ok_or_else(|| CrawlError::InvalidOrigin(request.url.clone()))?;
        info!(origin = %origin, "starting legal discovery");

        let snapshot = match &request.html {
            Some(html) => Some(html.clone()),
            None => run.html(&request.url).await?,
        };

        // 1. guesses
        let guesses = candidates::guess(&origin);

        // 2. live page
        let live = snapshot
            .as_deref()
            .map(|html| scan_live_links(html, &origin, &request.url))
            .unwrap_or_default();
        debug!("Live page links: {}", live.len());

        // 3. site root
        let root_url = origin.root();
        let root_links = match run.html(&root_url).await? {
            Some(html) => parse_page(&html, &origin, &root_url, true).links,
            None => Vec::new(),
        };
        debug!("Root page links: {}", root_links.len());

        // 4. site search, then sitemap
        let search_links = self.search_links(&origin, run).await?;
        debug!("Site search links: {}", search_links.len());
        let sitemap_links = if self.config.use_sitemap {
            self.sitemap_links(&origin, run).await?
        } else {
            Vec::new()
        };
        debug!("Sitemap links: {}", sitemap_links.len());

        // 5. merge
        let merged = sort_by_category_priority(urls::uniq(
            guesses
                .into_iter()
                .chain(live)
                .chain(root_links)
                .chain(search_links)
                .chain(sitemap_links),
        ));

        // 6. siblings
        let mut expanded = self.expand_siblings(&origin, merged, run).await?;

        // 7. cap
        expanded.truncate(self.config.max_pages);
        info!("Discovered {} candidate pages on {}", expanded.len(), origin);

        Ok(Discovered {
            origin,
            snapshot,
            candidates: expanded,
        })
    }

    async fn search_links(&self, origin: &Origin, run: &RunFetcher) -> Result<Vec<String>, CrawlError> {
        let probes = candidates::search_urls(origin);
        let bodies = self.fetch_all(&probes, run).await?;
        let links = probes
            .iter()
            .zip(bodies)
            .filter_map(|(url, body)| body.map(|html| parse_page(&html, origin, url, true).links))
            .flatten();
        Ok(urls::uniq(links))
    }

    async fn sitemap_links(&self, origin: &Origin, run: &RunFetcher) -> Result<Vec<String>, CrawlError> {
        let Some(url) = urls::absolutize(origin, SITEMAP_PATH) else {
            return Ok(Vec::new());
        };
        let Some(xml) = run.get(&url, ContentKind::Xml).await? else {
            return Ok(Vec::new());
        };
        match sitemap::legal_urls(&xml, origin) {
            Ok(links) => Ok(links),
            Err(e) => {
                warn!(url, error = %e, "unreadable sitemap");
                Ok(Vec::new())
            }
        }
    }

    /// Add legal-looking links found on the first `max_pages` candidates
    /// until the set holds `max_pages` URLs.
    async fn expand_siblings(
        &self,
        origin: &Origin,
        seeds: Vec<String>,
        run: &RunFetcher,
    ) -> Result<Vec<String>, CrawlError> {
        let limit = self.config.max_pages;
        let mut seen: HashSet<String> = seeds.iter().cloned().collect();
        let mut out = seeds.clone();

        for seed in seeds.iter().take(limit) {
            let Some(html) = run.html(seed).await? else {
                continue;
            };
            for link in parse_page(&html, origin, seed, true).links {
                if !LEGAL_TOKEN_RE.is_match(&link) {
                    continue;
                }
                if seen.insert(link.clone()) {
                    debug!(seed, link, "sibling candidate");
                    out.push(link);
                }
                if out.len() >= limit {
                    break;
                }
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    /// Fetch and parse every candidate, dropping refusals and thin pages.
    /// Output keeps candidate order.
    async fn fetch_pages(
        &self,
        origin: &Origin,
        candidates: &[String],
        run: &RunFetcher,
    ) -> Result<Vec<FetchedPage>, CrawlError> {
        let bodies = self.fetch_all(candidates, run).await?;
        let mut pages = Vec::new();
        for (url, body) in candidates.iter().zip(bodies) {
            let Some(html) = body else {
                debug!(url, "candidate refused");
                continue;
            };
            let parsed = parse_page(&html, origin, url, false);
            let words = word_count(&parsed.text);
            if words < self.config.min_words {
                debug!(url, words, "candidate too thin");
                continue;
            }
            pages.push(FetchedPage {
                url: url.clone(),
                title: parsed.title,
                text: parsed.text,
                word_count: words,
                category: categorize(url),
            });
        }
        Ok(pages)
    }

    /// Concurrent HTML fetches bounded by `concurrency`; results line up
    /// with `urls`.
    async fn fetch_all(&self, urls: &[String], run: &RunFetcher) -> Result<Vec<Option<String>>, CrawlError> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (idx, url) in urls.iter().enumerate() {
            let run = run.clone();
            let sem = Arc::clone(&semaphore);
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| CrawlError::Task(e.to_string()))?;
                let body = run.html(&url).await?;
                Ok::<_, CrawlError>((idx, body))
            });
        }

        let mut bodies = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, body) = joined??;
            bodies[idx] = body;
        }
        Ok(bodies)
    }
}

// ── Tests ──
