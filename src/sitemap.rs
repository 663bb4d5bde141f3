use anyhow::Result;
use url::Url;

use crate::urls::{uniq, Origin, LEGAL_TOKEN_RE};

pub const SITEMAP_PATH: &str = "/sitemap.xml";
/// Large sites list thousands of pages; only the first few legal hits matter.
pub const MAX_SITEMAP_CANDIDATES: usize = 20;

/// Same-origin `<loc>` entries of a urlset whose path looks like a legal page.
pub fn legal_urls(xml: &str, origin: &Origin) -> Result<Vec<String>> {
    let filtered = parse_urlset(xml)?
        .into_iter()
        .filter_map(|loc| {
            let url = Url::parse(loc.trim()).ok()?;
            if !origin.contains(&url) || !LEGAL_TOKEN_RE.is_match(url.path()) {
                return None;
            }
            Some(url.to_string())
        });
    Ok(uniq(filtered).into_iter().take(MAX_SITEMAP_CANDIDATES).collect())
}

/// Parse a urlset XML and return all <loc> URLs, plain or CDATA. A sitemap
/// index yields none.
fn parse_urlset(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut loc: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => loc = Some(String::new()),
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) => {
                if let Some(loc) = loc.as_mut() {
                    loc.push_str(&e.unescape()?);
                }
            }
            Ok(quick_xml::events::Event::CData(e)) => {
                if let Some(loc) = loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => {
                    if let Some(done) = loc.take() {
                        urls.push(done.trim().to_string());
                    }
                }
                b"url" => in_url = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}

// ── Tests ──
