use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::classifier::RiskClassifier;
use super::{classify_finding, RiskFinding, MAX_FINDINGS, MAX_SEVERITY, MIN_SEVERITY};

/// Normalized findings plus the classifier's untouched reply.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ranking {
    pub items: Vec<RiskFinding>,
    pub raw: String,
}

/// Ask the classifier for the five worst data risks among `clauses`.
///
/// A missing classifier, an empty clause list, a failed call or an unusable
/// reply all produce an empty ranking rather than an error.
pub async fn rank(
    classifier: Option<&dyn RiskClassifier>,
    url: &str,
    clauses: &[String],
) -> Ranking {
    let Some(classifier) = classifier else {
        debug!("risk classifier disabled, skipping ranking");
        return Ranking::default();
    };
    if clauses.is_empty() {
        return Ranking::default();
    }

    let prompt = build_prompt(url, clauses);
    let raw = match classifier.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(url, error = %e, "risk classifier call failed");
            return Ranking::default();
        }
    };

    let items = parse_findings(&raw);
    info!(url, clauses = clauses.len(), findings = items.len(), "ranked clauses");
    Ranking { items, raw }
}

pub fn build_prompt(url: &str, clauses: &[String]) -> String {
    let context = clauses
        .iter()
        .map(|c| format!("• {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "ROLE: You are a professional privacy risk analyst.\n\
         Read the policy clauses below and identify the FIVE most serious risks to user data.\n\
         \n\
         FOCUS:\n\
         - Worst-case reading: behavioural profiling and cross-site identity linking, sharing with or sale to\n\
         \x20 third parties, law-enforcement or government access, indefinite retention, use of user content\n\
         \x20 to train AI models, misuse of sensitive data (biometric, health, location, children), breach exposure.\n\
         - Skip low-impact items such as ordinary cookies, parental controls or basic analytics.\n\
         - Where a clause is vague, state the reasonable worst-case implication.\n\
         - Always return exactly five findings, each from a different risk category.\n\
         \n\
         OUTPUT:\n\
         - STRICT JSON ONLY, no commentary before or after.\n\
         - Shape: [{{\"title\":\"short title\",\"clause\":\"one-sentence summary of the clause\",\
         \"harm\":\"1-2 sentence plain-English impact\",\"severity\":5}}]\n\
         - severity is an integer: 8-10 major, 5-7 moderate, never below 5.\n\
         - Professional tone, no exaggeration.\n\
         \n\
         URL: {url}\n\
         CLAUSES:\n\
         {context}"
    )
}

/// Pull the first `[ ... ]` span out of `raw`, keep one finding per risk
/// category (first wins) and stop at five. Anything unparseable yields none.
pub fn parse_findings(raw: &str) -> Vec<RiskFinding> {
    let Some(span) = bracket_span(raw) else {
        debug!("classifier reply has no JSON array");
        return Vec::new();
    };
    let entries: Vec<Value> = match serde_json::from_str(span) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "classifier reply is not a JSON array");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for entry in &entries {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let title = text_field(obj.get("title"));
        let clause = text_field(obj.get("clause"));
        let category = classify_finding(&format!("{} {}", title, clause));
        if !seen.insert(category) {
            continue;
        }
        items.push(RiskFinding {
            title,
            clause,
            harm: text_field(obj.get("harm")),
            severity: severity(obj.get("severity")),
            category,
        });
        if items.len() == MAX_FINDINGS {
            break;
        }
    }
    items
}

/// From the first `[` to the last `]`.
fn bracket_span(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

fn text_field(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Integer severity clamped to 5..=10. Missing, zero or unparseable values
/// fall back to 5; "8/10" reads as 8 and 7.9 as 7.
fn severity(value: Option<&Value>) -> u8 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => leading_int(s),
        _ => None,
    };
    match parsed {
        None | Some(0) => MIN_SEVERITY,
        Some(n) => n.clamp(MIN_SEVERITY as i64, MAX_SEVERITY as i64) as u8,
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate absurdly long digit runs rather than failing
    let n = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * n)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::FindingCategory;
    use crate::testing::CannedClassifier;

    fn clauses() -> Vec<String> {
        vec!["We may share your information with partners.".to_string()]
    }

    #[tokio::test]
    async fn disabled_classifier_returns_empty() {
        let ranking = rank(None, "https://example.com", &clauses()).await;
        assert!(ranking.items.is_empty());
        assert_eq!(ranking.raw, "");
    }

    #[tokio::test]
    async fn prose_reply_keeps_raw_text() {
        let reply = "I could not find any concerning clauses in this policy.";
        let classifier = CannedClassifier::replying(reply);
        let ranking = rank(Some(&classifier), "https://example.com", &clauses()).await;
        assert!(ranking.items.is_empty());
        assert_eq!(ranking.raw, reply);
    }

    #[tokio::test]
    async fn failed_call_degrades_to_empty() {
        let classifier = CannedClassifier::failing();
        let ranking = rank(Some(&classifier), "https://example.com", &clauses()).await;
        assert!(ranking.items.is_empty());
        assert_eq!(ranking.raw, "");
    }

    #[tokio::test]
    async fn empty_clause_list_skips_the_call() {
        let classifier = CannedClassifier::replying("[]");
        let ranking = rank(Some(&classifier), "https://example.com", &[]).await;
        assert!(ranking.raw.is_empty());
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_carries_url_and_every_clause() {
        let classifier = CannedClassifier::replying("[]");
        let clauses = vec!["First clause.".to_string(), "Second clause.".to_string()];
        rank(Some(&classifier), "https://example.com/privacy", &clauses).await;
        let prompt = classifier.last_prompt().unwrap();
        assert!(prompt.contains("URL: https://example.com/privacy"));
        assert!(prompt.contains("• First clause.\n• Second clause."));
        assert!(prompt.contains("exactly five"));
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "Here you go:\n```json\n[{\"title\":\"Cross-site profiling\",\"clause\":\"We build profiles.\",\"harm\":\"You are tracked.\",\"severity\":9}]\n```";
        let items = parse_findings(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Cross-site profiling");
        assert_eq!(items[0].severity, 9);
        assert_eq!(items[0].category, FindingCategory::Profiling);
    }

    #[test]
    fn dedupes_by_category_and_caps_at_five() {
        let raw = r#"[
            {"title":"Profiling","clause":"behavioral ads","harm":"h","severity":9},
            {"title":"More tracking","clause":"cross-site","harm":"h","severity":8},
            {"title":"Sold to advertisers","clause":"c","harm":"h","severity":8},
            {"title":"Government access","clause":"subpoena","harm":"h","severity":7},
            {"title":"Kept forever","clause":"indefinite retention","harm":"h","severity":7},
            {"title":"AI use","clause":"used as training data","harm":"h","severity":6},
            {"title":"Biometric data","clause":"face scans","harm":"h","severity":10}
        ]"#;
        let items = parse_findings(raw);
        assert_eq!(items.len(), MAX_FINDINGS);
        let cats: HashSet<_> = items.iter().map(|i| i.category).collect();
        assert_eq!(cats.len(), items.len());
        assert_eq!(items[1].title, "Sold to advertisers");
        assert!(!items.iter().any(|i| i.title == "Biometric data"));
    }

    #[test]
    fn severity_is_clamped_and_defaulted() {
        let raw = r#"[
            {"title":"a","clause":"profiling","severity":2},
            {"title":"b","clause":"advertisers","severity":42},
            {"title":"c","clause":"subpoena","severity":"8/10"},
            {"title":"d","clause":"retention","severity":"high"},
            {"title":"e","clause":"training data","severity":6.9},
            {"title":"f","clause":"biometric"}
        ]"#;
        let sev: Vec<u8> = parse_findings(raw).iter().map(|i| i.severity).collect();
        assert_eq!(sev, vec![5, 10, 8, 5, 6]);
        for s in sev {
            assert!((MIN_SEVERITY..=MAX_SEVERITY).contains(&s));
        }
    }

    #[test]
    fn zero_and_negative_severity() {
        assert_eq!(severity(Some(&serde_json::json!(0))), 5);
        assert_eq!(severity(Some(&serde_json::json!(-4))), 5);
        assert_eq!(severity(Some(&serde_json::json!("  9 points"))), 9);
        assert_eq!(severity(Some(&serde_json::json!(null))), 5);
        assert_eq!(severity(None), 5);
    }

    #[test]
    fn strings_are_collapsed_and_non_objects_skipped() {
        let raw = r#"[ "stray", 7, {"title":"  Data   sold \n to partners ","clause":" x\t y ","harm":null,"severity":7} ]"#;
        let items = parse_findings(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Data sold to partners");
        assert_eq!(items[0].clause, "x y");
        assert_eq!(items[0].harm, "");
    }

    #[test]
    fn malformed_json_yields_nothing() {
        assert!(parse_findings("[{\"title\": \"unterminated\"").is_empty());
        assert!(parse_findings("] backwards [").is_empty());
        assert!(parse_findings("[not json]").is_empty());
        assert!(parse_findings("").is_empty());
    }
}
