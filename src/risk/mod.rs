pub mod classifier;
pub mod ranker;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use classifier::{build_classifier, RiskClassifier};
pub use ranker::{rank, Ranking};

pub const MAX_FINDINGS: usize = 5;
pub const MIN_SEVERITY: u8 = 5;
pub const MAX_SEVERITY: u8 = 10;

/// Risk theme used to keep the top findings diverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    Profiling,
    ThirdParty,
    Law,
    Retention,
    Ai,
    Sensitive,
    Breach,
    Misc,
}

impl FindingCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingCategory::Profiling => "profiling",
            FindingCategory::ThirdParty => "thirdparty",
            FindingCategory::Law => "law",
            FindingCategory::Retention => "retention",
            FindingCategory::Ai => "ai",
            FindingCategory::Sensitive => "sensitive",
            FindingCategory::Breach => "breach",
            FindingCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static FINDING_RULES: LazyLock<Vec<(FindingCategory, Regex)>> = LazyLock::new(|| {
    [
        (FindingCategory::Profiling, r"\b(profile|profiling|behavioral|cross[-\s]?site|identity linking|tracking)\b"),
        (FindingCategory::ThirdParty, r"\b(third[-\s]?party|partners|vendors|advertisers|affiliates|sharing)\b"),
        (FindingCategory::Law, r"\b(law enforcement|government|subpoena|court|legal request|compliance)\b"),
        (FindingCategory::Retention, r"\b(retain|retention|store|storage|preserve|archiv)\b"),
        (FindingCategory::Ai, r"\b(train|training data|ai model|machine learning)\b"),
        (FindingCategory::Sensitive, r"\b(biometric|location|children|health|financial|sensitive)\b"),
        (FindingCategory::Breach, r"\b(breach|unauthorized|security|exposure|leak)\b"),
    ]
    .into_iter()
    .map(|(cat, pat)| (cat, Regex::new(&format!("(?i){pat}")).unwrap()))
    .collect()
});

/// First matching theme wins, `Misc` otherwise.
pub fn classify_finding(text: &str) -> FindingCategory {
    FINDING_RULES
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(cat, _)| *cat)
        .unwrap_or(FindingCategory::Misc)
}

/// One normalized risk. `category` is derived and not exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFinding {
    pub title: String,
    pub clause: String,
    pub harm: String,
    pub severity: u8,
    #[serde(skip)]
    pub category: FindingCategory,
}

/// Colour band for a 1-10 severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityBand {
    Critical,
    High,
    Moderate,
    Low,
}

impl SeverityBand {
    pub fn of(severity: u8) -> Self {
        match severity {
            9.. => SeverityBand::Critical,
            7..=8 => SeverityBand::High,
            5..=6 => SeverityBand::Moderate,
            _ => SeverityBand::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityBand::Critical => "critical",
            SeverityBand::High => "high",
            SeverityBand::Moderate => "moderate",
            SeverityBand::Low => "low",
        }
    }
}

// ── Tests ──
