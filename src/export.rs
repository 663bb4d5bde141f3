use anyhow::Result;

use crate::report::CrawlReport;
use crate::risk::SeverityBand;

const HEADER: &str = "Top 5 User-Data Risks";

/// Plain-text rendering for terminals and `.txt` exports.
pub fn to_text(report: &CrawlReport) -> String {
    let mut lines = Vec::new();
    lines.push(HEADER.to_string());
    lines.push(
        report
            .combined
            .as_ref()
            .map(|c| c.url.clone())
            .unwrap_or_default(),
    );
    lines.push(String::new());

    if let Some(error) = &report.error {
        lines.push(format!("Scan failed: {}", error));
        return lines.join("\n");
    }

    if !report.sections.is_empty() {
        lines.push("== Sections ==".to_string());
        for s in &report.sections {
            lines.push(format!("- [{}] {} ({} words)", s.category, s.title, s.word_count));
        }
        lines.push(String::new());
    }

    if report.top5.is_empty() {
        lines.push("No clear data-related violations found.".to_string());
    } else {
        lines.push("== Top 5 ==".to_string());
        for (i, f) in report.top5.iter().enumerate() {
            lines.push(format!("{}) {}", i + 1, f.title));
            if !f.clause.is_empty() {
                lines.push(format!("   Clause: {}", f.clause));
            }
            if !f.harm.is_empty() {
                lines.push(format!("   Harm: {}", f.harm));
            }
            lines.push(format!(
                "   Severity: {}/10 ({})",
                f.severity,
                SeverityBand::of(f.severity).label()
            ));
        }
    }

    lines.push(String::new());
    lines.push(report.summary.clone());
    lines.join("\n")
}

/// The whole report, pretty-printed.
pub fn to_json(report: &CrawlReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ── Tests ──
