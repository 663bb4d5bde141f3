use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Anchor text / aria-label / href filter for the live page scan.
pub static LEGAL_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(terms?|tos|privacy|policy|policies|legal|eula|cookie|cookies|data|safety|security|guidelines|community)\b").unwrap()
});

/// Narrower filter used when pulling links out of fetched HTML.
pub static LEGAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(terms?|tos|privacy|policy|policies|legal|eula|cookie|conditions)\b").unwrap()
});

/// Tokens a sibling or sitemap URL must carry to count as legal-ish.
pub static LEGAL_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(terms?|privacy|policy|polic|cookie|cookies|legal|eula|data|safety|security|guidelines|community)\b").unwrap()
});

static CATEGORY_RULES: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    [
        (Category::Terms, r"terms-of|terms|tos"),
        (Category::Privacy, r"privacy"),
        (Category::Legal, r"legal"),
        (Category::Policy, r"polic(y|ies)"),
        (Category::Cookie, r"cookie"),
        (Category::Safety, r"safety"),
        (Category::Security, r"security"),
        (Category::Guidelines, r"guidelines|community"),
    ]
    .into_iter()
    .map(|(cat, pat)| (cat, Regex::new(pat).unwrap()))
    .collect()
});

/// scheme://host[:port] of the site being crawled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare root page, `<origin>/`.
    pub fn root(&self) -> String {
        format!("{}/", self.0)
    }

    pub fn contains(&self, url: &Url) -> bool {
        url.origin().ascii_serialization() == self.as_str()
    }

    fn base(&self) -> Option<Url> {
        Url::parse(self.as_str()).ok()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `url` and return its origin. Only http(s) URLs have a usable one.
pub fn to_origin(url: &str) -> Option<Origin> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(Origin(origin.ascii_serialization()))
}

/// Resolve a path or URL against the origin root; `None` if it leaves the origin.
pub fn absolutize(origin: &Origin, path_or_url: &str) -> Option<String> {
    let base = origin.base()?;
    resolve(origin, &base, path_or_url)
}

/// Resolve `href` relative to `base`, keeping it only if it stays on `origin`.
pub fn resolve(origin: &Origin, base: &Url, href: &str) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    origin.contains(&url).then(|| url.to_string())
}

/// Stable de-duplication, first occurrence wins, empty entries dropped.
pub fn uniq<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let item: String = item.into();
        if item.is_empty() || !seen.insert(item.clone()) {
            continue;
        }
        out.push(item);
    }
    out
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Terms,
    Privacy,
    Legal,
    Policy,
    Cookie,
    Safety,
    Security,
    Guidelines,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Terms,
        Category::Privacy,
        Category::Legal,
        Category::Policy,
        Category::Cookie,
        Category::Safety,
        Category::Security,
        Category::Guidelines,
        Category::Other,
    ];

    /// Sort rank: terms first, other last.
    pub fn priority(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Terms => "terms",
            Category::Privacy => "privacy",
            Category::Legal => "legal",
            Category::Policy => "policy",
            Category::Cookie => "cookie",
            Category::Safety => "safety",
            Category::Security => "security",
            Category::Guidelines => "guidelines",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First matching rule wins; anything unmatched is `Other`.
pub fn categorize(url: &str) -> Category {
    let lower = url.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(cat, _)| *cat)
        .unwrap_or(Category::Other)
}

pub fn sort_by_category_priority(mut urls: Vec<String>) -> Vec<String> {
    urls.sort_by_key(|u| categorize(u).priority());
    urls
}

// ── Tests ──
