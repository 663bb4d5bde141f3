use std::collections::HashSet;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

/// Sentences at or above this length are not a single clause.
const MAX_SENTENCE_CHARS: usize = 900;
const RUN_ON_CHARS: usize = 300;
/// Below this many scored sentences the raw fallback pool is appended.
const FALLBACK_THRESHOLD: usize = 100;
const FALLBACK_POOL: usize = 120;
pub const MAX_CANDIDATES: usize = 300;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());
static BROAD_TOUCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(data|information|privacy|identifier|cookie|advertis|analytics|usage|content|profile)\b").unwrap()
});
static HEDGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)we may").unwrap());

pub struct Cluster {
    pub name: &'static str,
    re: Regex,
    pub weight: i32,
}

static CLUSTERS: LazyLock<Vec<Cluster>> = LazyLock::new(|| {
    [
        ("collection", r"\b(collect|gather|obtain|receive|acquire)\b.*\b(data|information|identifiers?|content|usage)\b", 4),
        ("sharing", r"\b(share|disclose|transfer|provide|sell|broker)\b.*\b(data|information)\b", 6),
        ("thirdparty", r"\b(third[-\s]?part(y|ies)|affiliates|partners|vendors|advertisers|analytics)\b", 5),
        ("tracking", r"\b(track|tracking|pixel|beacon|cookie|sdk|fingerprint|profil(e|ing)|cross[-\s]?site)\b", 6),
        ("retention", r"\b(retain|store|keep|preserve)\b.*\b(as long as|indefinite|necessary|required)\b", 5),
        ("consent", r"\b(consent|permission|opt[-\s]?out|opt[-\s]?in)\b", 3),
        ("sensitive", r"\b(precise location|biometric|genetic|health|financial|children|minor|ssn)\b", 7),
        ("combine", r"\b(combine|link|associate)\b.*\b(data|information|datasets?)\b", 4),
        ("control", r"\b(access|delete|erase|port|restrict|object)\b.*\b(request|right|ability|may refuse)\b", 4),
        ("security", r"\b(security|breach|unauthorized)\b", 2),
        ("information", r"\b(information (you provide|we collect|we receive|we use|we share|about you))\b", 5),
    ]
    .into_iter()
    .map(|(name, pat, weight)| Cluster {
        name,
        re: Regex::new(&format!("(?i){pat}")).unwrap(),
        weight,
    })
    .collect()
});

/// A sentence in the ranking pool. Fallback entries carry no score.
#[derive(Debug, Clone)]
struct ClauseCandidate {
    sentence: String,
    score: Option<i32>,
}

/// Collapse whitespace and split after `.`, `!` or `?` followed by whitespace.
/// Empty and over-long sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END_RE.find_iter(&collapsed) {
        // keep the punctuation, drop the whitespace
        push_sentence(&mut out, &collapsed[start..m.start() + 1]);
        start = m.end();
    }
    push_sentence(&mut out, &collapsed[start..]);
    out
}

fn push_sentence(out: &mut Vec<String>, s: &str) {
    if s.trim().is_empty() || s.chars().count() >= MAX_SENTENCE_CHARS {
        return;
    }
    out.push(s.to_string());
}

pub fn score_sentence(sentence: &str) -> i32 {
    let mut score: i32 = CLUSTERS
        .iter()
        .filter(|c| c.re.is_match(sentence))
        .map(|c| c.weight)
        .sum();
    if BROAD_TOUCH_RE.is_match(sentence) {
        score += 1;
    }
    if HEDGE_RE.is_match(sentence) {
        score += 1;
    }
    if sentence.chars().count() > RUN_ON_CHARS {
        score -= 1;
    }
    score
}

/// Names of the clusters a sentence hits, in table order.
pub fn matching_clusters(sentence: &str) -> Vec<&'static str> {
    CLUSTERS
        .iter()
        .filter(|c| c.re.is_match(sentence))
        .map(|c| c.name)
        .collect()
}

/// Rank the sentences of `text` by data-risk relevance and return at most
/// `MAX_CANDIDATES` of them, best first. Low-signal documents are padded with
/// their leading raw sentences.
pub fn extract_clauses(text: &str) -> Vec<String> {
    let sentences = split_sentences(text);
    let scores: Vec<i32> = sentences.par_iter().map(|s| score_sentence(s)).collect();

    let mut seen = HashSet::new();
    let mut pool: Vec<ClauseCandidate> = Vec::new();
    for (raw, score) in sentences.iter().zip(scores) {
        if score <= 0 {
            continue;
        }
        let sentence = raw.trim();
        if !seen.insert(sentence.to_lowercase()) {
            continue;
        }
        pool.push(ClauseCandidate {
            sentence: sentence.to_string(),
            score: Some(score),
        });
    }

    // stable: equal scores keep document order
    pool.sort_by(|a, b| b.score.cmp(&a.score));

    if pool.len() < FALLBACK_THRESHOLD {
        pool.extend(sentences.iter().take(FALLBACK_POOL).map(|s| ClauseCandidate {
            sentence: s.trim().to_string(),
            score: None,
        }));
    }

    pool.truncate(MAX_CANDIDATES);
    pool.into_iter().map(|c| c.sentence).collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral(i: usize) -> String {
        format!("Sentence number {i} talks about the weather today.")
    }

    fn risky(i: usize) -> String {
        format!("We may share your information with third-party advertisers in region {i}.")
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("First one.  Second\n\none!   Third? Trailing");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?", "Trailing"]);
    }

    #[test]
    fn does_not_split_without_whitespace() {
        let s = split_sentences("Visit example.com today. Thanks.");
        assert_eq!(s, vec!["Visit example.com today.", "Thanks."]);
    }

    #[test]
    fn drops_overlong_sentences() {
        let long = format!("{}.", "word ".repeat(200));
        let text = format!("Short one. {long} Another short.");
        let s = split_sentences(&text);
        assert_eq!(s, vec!["Short one.", "Another short."]);
    }

    #[test]
    fn scores_weighted_clusters() {
        // sharing 6 + thirdparty 5 + broad 1 + hedge 1
        assert_eq!(score_sentence(&risky(1)), 13);
        assert_eq!(score_sentence(&neutral(1)), 0);
        assert_eq!(
            matching_clusters(&risky(1)),
            vec!["sharing", "thirdparty"]
        );
    }

    #[test]
    fn penalizes_run_on_sentences() {
        let base = "We use a tracking cookie";
        let padded = format!("{base} {}", "and so on ".repeat(35));
        assert!(padded.chars().count() > 300);
        assert_eq!(score_sentence(&padded), score_sentence(base) - 1);
    }

    #[test]
    fn ranks_by_score_and_dedupes_case_insensitively() {
        let text = format!(
            "We set a cookie. {} WE SET A COOKIE. We collect precise location data and health information.",
            neutral(0)
        );
        let out = extract_clauses(&text);
        assert_eq!(out[0], "We collect precise location data and health information.");
        assert_eq!(out[1], "We set a cookie.");
        // scored pool was small, so raw sentences follow
        assert!(out[2..].contains(&neutral(0)));
        // the upper-case repeat only re-enters through the raw fallback
        assert_eq!(out.iter().filter(|s| s.as_str() == "WE SET A COOKIE.").count(), 1);
    }

    #[test]
    fn equal_scores_keep_document_order() {
        let text = (0..5).map(risky).collect::<Vec<_>>().join(" ");
        let out = extract_clauses(&text);
        assert_eq!(&out[..5], &(0..5).map(risky).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn unscored_document_returns_every_sentence() {
        let text = (0..50).map(neutral).collect::<Vec<_>>().join(" ");
        let out = extract_clauses(&text);
        assert_eq!(out, (0..50).map(neutral).collect::<Vec<_>>());
    }

    #[test]
    fn fallback_caps_at_pool_size() {
        let text = (0..500).map(neutral).collect::<Vec<_>>().join(" ");
        assert_eq!(extract_clauses(&text).len(), FALLBACK_POOL);
    }

    #[test]
    fn no_fallback_when_enough_scored() {
        let mut parts: Vec<String> = (0..150).map(risky).collect();
        parts.extend((0..20).map(neutral));
        let out = extract_clauses(&parts.join(" "));
        assert_eq!(out.len(), 150);
        assert!(out.iter().all(|s| score_sentence(s) > 0));
    }

    #[test]
    fn never_exceeds_max_candidates() {
        let text = (0..400).map(risky).collect::<Vec<_>>().join(" ");
        assert_eq!(extract_clauses(&text).len(), MAX_CANDIDATES);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(extract_clauses("").is_empty());
        assert!(extract_clauses("   \n\t ").is_empty());
    }
}
