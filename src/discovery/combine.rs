use std::cmp::Reverse;

use crate::report::{CombinedSummary, FetchedPage};
use crate::urls::word_count;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Terms first, other last; longer documents first within a category.
pub fn order_pages(pages: &mut [FetchedPage]) {
    pages.sort_by_key(|p| (p.category.priority(), Reverse(p.word_count)));
}

/// Titled sections joined into one blob, plus its summary. `pages` must
/// already be ordered and non-empty for a summary to exist.
pub fn combine(pages: &[FetchedPage]) -> (String, Option<CombinedSummary>) {
    let text = pages
        .iter()
        .map(|p| format!("# {}\n{}", p.title, p.text))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);

    let summary = pages.first().map(|lead| CombinedSummary {
        title: format!("{} (combined)", lead.title),
        url: lead.url.clone(),
        word_count: word_count(&text),
    });
    (text, summary)
}

// ── Tests ──
