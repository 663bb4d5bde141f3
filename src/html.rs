use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::urls::{self, Origin, LEGAL_ANCHOR_RE, LEGAL_LINK_RE};

/// Never part of readable policy text.
const STRIP_ALWAYS: &[&str] = &["script", "style", "noscript", "template", "svg", "canvas", "iframe"];
/// Page chrome dropped from fetched documents.
const STRIP_CHROME: &[&str] = &["header", "nav", "footer", "aside"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "table", "tr", "td", "th",
    "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "dd", "dt", "dl", "hr",
];

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static MAIN_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("main, article, [role='main'], .content, #content, .legal, .tos, .privacy, .policy")
        .unwrap()
});
/// Anchors plus nav, footer and menu-scoped ones on the live page.
static LIVE_ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "a[href], nav a[href], footer a[href], [role='menuitem'][href], \
         [class*='nav'] a[href], [class*='menu'] a[href], [class*='footer'] a[href]",
    )
    .unwrap()
});

static INLINE_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\u{a0}]+").unwrap());
static LINE_EDGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" *\n *").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: String,
    pub text: String,
    pub links: Vec<String>,
}

/// Title, cleaned main-content text and (optionally) same-origin legal links.
pub fn parse_page(html: &str, origin: &Origin, base_url: &str, want_links: bool) -> ParsedPage {
    let doc = Html::parse_document(html);
    let title = extract_title(&doc, base_url);

    let root = doc
        .select(&MAIN_SEL)
        .next()
        .or_else(|| doc.select(&BODY_SEL).next())
        .unwrap_or_else(|| doc.root_element());
    let mut raw = String::new();
    collect_text(root, &[STRIP_ALWAYS, STRIP_CHROME], &mut raw);
    let text = normalize(&raw);

    let links = match base_or_root(origin, base_url) {
        Some(base) if want_links => scan_anchors(&doc, &ANCHOR_SEL, &LEGAL_LINK_RE, origin, &base),
        _ => Vec::new(),
    };

    ParsedPage { title, text, links }
}

/// Same-origin legal-looking links on the page the user is looking at.
pub fn scan_live_links(html: &str, origin: &Origin, page_url: &str) -> Vec<String> {
    let Some(base) = base_or_root(origin, page_url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    scan_anchors(&doc, &LIVE_ANCHOR_SEL, &LEGAL_ANCHOR_RE, origin, &base)
}

/// Everything a reader would see in the body, chrome included.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let root = doc.select(&BODY_SEL).next().unwrap_or_else(|| doc.root_element());
    let mut raw = String::new();
    collect_text(root, &[STRIP_ALWAYS], &mut raw);
    normalize(&raw)
}

fn extract_title(doc: &Html, base_url: &str) -> String {
    let from_tag = doc
        .select(&TITLE_SEL)
        .next()
        .map(|el| el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty());
    if let Some(title) = from_tag {
        return title;
    }
    match Url::parse(base_url) {
        Ok(u) => u.path().to_string(),
        Err(_) => "Document".to_string(),
    }
}

/// Off-origin or malformed base URLs resolve against the origin root instead.
fn base_or_root(origin: &Origin, base_url: &str) -> Option<Url> {
    Url::parse(base_url)
        .ok()
        .filter(|u| origin.contains(u))
        .or_else(|| Url::parse(&origin.root()).ok())
}

fn scan_anchors(
    doc: &Html,
    selector: &Selector,
    pattern: &Regex,
    origin: &Origin,
    base: &Url,
) -> Vec<String> {
    let mut hits = Vec::new();
    for a in doc.select(selector) {
        let href = a.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }
        let text = a.text().collect::<String>();
        let aria = a.value().attr("aria-label").unwrap_or("");
        let haystack = format!("{} {} {}", text.trim(), aria.trim(), href);
        if !pattern.is_match(&haystack) {
            continue;
        }
        if let Some(abs) = urls::resolve(origin, base, href) {
            hits.push(abs);
        }
    }
    urls::uniq(hits)
}

fn collect_text(el: ElementRef, skip: &[&[&str]], out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => {
                let name = e.name();
                if skip.iter().any(|set| set.contains(&name)) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_el, skip, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn normalize(raw: &str) -> String {
    let text = INLINE_WS_RE.replace_all(raw, " ");
    let text = LINE_EDGE_RE.replace_all(&text, "\n");
    BLANK_LINES_RE.replace_all(&text, "\n\n").trim().to_string()
}

// ── Tests ──
