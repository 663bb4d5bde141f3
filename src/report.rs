use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::risk::{Ranking, RiskFinding};
use crate::urls::{Category, Origin};

/// One scan of the site behind `url`. `html` is the page as the user sees
/// it; without it the engine fetches `url` itself.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: String,
    pub html: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: None,
        }
    }

    pub fn with_snapshot(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

/// A candidate that fetched, parsed and cleared the word floor.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub text: String,
    pub word_count: usize,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub url: String,
    pub title: String,
    pub word_count: usize,
    pub category: Category,
}

impl From<&FetchedPage> for SectionSummary {
    fn from(page: &FetchedPage) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            word_count: page.word_count,
            category: page.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSummary {
    pub title: String,
    pub url: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlStatus {
    /// Legal pages were found and combined.
    Success,
    /// Nothing usable was found; the current page was scanned instead.
    SuccessEmpty,
    Failure,
}

impl CrawlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CrawlStatus::Success => "success",
            CrawlStatus::SuccessEmpty => "success-empty",
            CrawlStatus::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub ok: bool,
    pub status: CrawlStatus,
    pub origin: Option<Origin>,
    pub combined: Option<CombinedSummary>,
    pub sections: Vec<SectionSummary>,
    pub top5: Vec<RiskFinding>,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: String,
    /// Distinct URLs requested during the run.
    pub fetched: usize,
    pub scanned_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn success(
        origin: Origin,
        pages: &[FetchedPage],
        combined: Option<CombinedSummary>,
        ranking: Ranking,
        fetched: usize,
    ) -> Self {
        let status = if combined.is_some() {
            CrawlStatus::Success
        } else {
            CrawlStatus::SuccessEmpty
        };
        let sections: Vec<SectionSummary> = pages.iter().map(SectionSummary::from).collect();
        let summary = summarize(
            sections.len(),
            ranking.items.len(),
            combined.as_ref().map(|c| c.word_count),
        );
        Self {
            ok: true,
            status,
            origin: Some(origin),
            combined,
            sections,
            top5: ranking.items,
            raw: ranking.raw,
            error: None,
            summary,
            fetched,
            scanned_at: Utc::now(),
        }
    }

    pub fn failure(origin: Option<Origin>, error: impl ToString, fetched: usize) -> Self {
        let error = error.to_string();
        Self {
            ok: false,
            status: CrawlStatus::Failure,
            origin,
            combined: None,
            sections: Vec::new(),
            top5: Vec::new(),
            raw: String::new(),
            summary: format!("Scan failed: {}", error),
            error: Some(error),
            fetched,
            scanned_at: Utc::now(),
        }
    }
}

fn summarize(sections: usize, findings: usize, words: Option<usize>) -> String {
    let words = match words {
        Some(n) => format!("{} words total", n),
        None => "no combined text".to_string(),
    };
    format!(
        "Found {} section(s), returned {} finding(s); {}.",
        sections, findings, words
    )
}

// ── Tests ──
