use url::Url;

use crate::urls::{self, categorize, Category, Origin};

/// Where sites usually keep their legal documents.
pub const COMMON_PATHS: &[&str] = &[
    "/terms",
    "/terms-of-service",
    "/terms-of-use",
    "/tos",
    "/privacy",
    "/privacy-policy",
    "/legal",
    "/policies",
    "/policy",
    "/eula",
    "/support/terms",
    "/support/privacy",
    "/support/legal",
    "/about/terms",
    "/about/privacy",
    "/company/terms",
    "/company/privacy",
];

/// Internal site-search probes; result pages often link the real documents.
pub const SEARCH_PATHS: &[&str] = &[
    "/search?q=terms",
    "/search?q=privacy",
    "/search?q=legal",
    "/search?q=policy",
    "/support/search?q=terms",
    "/support/search?q=privacy",
    "/support/search?q=legal",
];

const PICK_PER_CATEGORY: usize = 3;

/// Rooted guesses, at most three per category.
pub fn guess(origin: &Origin) -> Vec<String> {
    let urls = COMMON_PATHS.iter().filter_map(|p| urls::absolutize(origin, p));
    group_and_pick(urls)
}

pub fn search_urls(origin: &Origin) -> Vec<String> {
    SEARCH_PATHS
        .iter()
        .filter_map(|p| urls::absolutize(origin, p))
        .collect()
}

/// Bucket by category (buckets in first-seen order), keep the least
/// specific URLs of each bucket.
pub fn group_and_pick<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut buckets: Vec<(Category, Vec<String>)> = Vec::new();
    for url in urls::uniq(urls) {
        let category = categorize(&url);
        match buckets.iter_mut().find(|(c, _)| *c == category) {
            Some((_, list)) => list.push(url),
            None => buckets.push((category, vec![url])),
        }
    }

    let mut picked = Vec::new();
    for (_, mut list) in buckets {
        list.sort_by_key(|u| specificity(u));
        picked.extend(list.into_iter().take(PICK_PER_CATEGORY));
    }
    picked
}

/// Path depth, +2 for a query, +1 for a fragment. Lower is cleaner.
pub fn specificity(url: &str) -> usize {
    let Ok(u) = Url::parse(url) else {
        return 99;
    };
    let segments = u.path().split('/').filter(|s| !s.is_empty()).count();
    let query = if u.query().is_some_and(|q| !q.is_empty()) { 2 } else { 0 };
    let fragment = if u.fragment().is_some_and(|f| !f.is_empty()) { 1 } else { 0 };
    segments + query + fragment
}

// ── Tests ──
