//! Report writers: HTML cards, JSON dumps, Termbase text and the batch summary.
//!
//! Rendering is pure and deterministic. Writers create parent directories and
//! overwrite whatever is already at the target path.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::direction::Direction;
use crate::models::{NameEvaluationResult, RealPersonRules, TaskRecord};

pub const RESULTS_JSON: &str = "name_evaluation_results.json";
pub const SUMMARY_JSON: &str = "name_evaluation_summary.json";
pub const COMBINED_HTML: &str = "name_evaluation_report.html";

pub fn direction_html_file(direction: Direction) -> String {
    format!("{}_evaluation_report.html", direction.slug())
}

pub fn termbase_file(direction: Direction) -> String {
    format!("{}_termbase_entries.txt", direction.slug())
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

// ==================== JSON ====================

pub fn write_json_report(path: &Path, results: &[NameEvaluationResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    write_file(path, &json)
}

pub fn read_json_report(path: &Path) -> Result<Vec<NameEvaluationResult>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid report JSON in {}", path.display()))
}

// ==================== HTML ====================

const HTML_STYLE: &str = r#"        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            margin: 0;
            padding: 20px;
            color: #333;
        }
        h1 {
            color: #2c3e50;
            border-bottom: 2px solid #eee;
            padding-bottom: 10px;
        }
        .name-card {
            background-color: #f9f9f9;
            border-radius: 5px;
            padding: 20px;
            margin-bottom: 20px;
            box-shadow: 0 2px 5px rgba(0,0,0,0.1);
        }
        .name-header {
            display: flex;
            justify-content: space-between;
            align-items: center;
            margin-bottom: 15px;
        }
        .name-title {
            font-size: 24px;
            font-weight: bold;
            color: #2980b9;
        }
        .score {
            font-size: 18px;
            font-weight: bold;
            padding: 8px 12px;
            border-radius: 4px;
            color: white;
        }
        .score-high { background-color: #27ae60; }
        .score-medium { background-color: #f39c12; }
        .score-low { background-color: #e74c3c; }
        .details { margin-top: 15px; }
        .detail-row { display: flex; margin-bottom: 8px; }
        .detail-label { flex: 0 0 200px; font-weight: bold; }
        .detail-value { flex: 1; }
        .tag {
            display: inline-block;
            background-color: #eee;
            padding: 3px 8px;
            border-radius: 3px;
            margin-right: 5px;
            font-size: 14px;
        }
        .compliance {
            margin-top: 15px;
            padding: 10px;
            background-color: #f8f9fa;
            border-radius: 4px;
        }
        .check { color: #27ae60; }
        .cross { color: #e74c3c; }
        .recommendations {
            margin-top: 15px;
            padding: 10px;
            background-color: #f0f7fb;
            border-radius: 4px;
            border-left: 5px solid #3498db;
        }
        .notes {
            margin-top: 15px;
            padding: 10px;
            background-color: #fdecea;
            border-radius: 4px;
            white-space: pre-wrap;
        }
        .teamwork {
            margin-top: 15px;
            padding: 10px;
            background-color: #fff8e1;
            border-radius: 4px;
            border-left: 5px solid #ffc107;
        }
"#;

pub fn score_class(score: u8) -> &'static str {
    if score >= 80 {
        "score-high"
    } else if score >= 50 {
        "score-medium"
    } else {
        "score-low"
    }
}

fn check_mark(ok: bool) -> &'static str {
    if ok {
        "<span class=\"check\">✓</span>"
    } else {
        "<span class=\"cross\">✗</span>"
    }
}

fn detail_row(html: &mut String, label: &str, value_html: &str) {
    let _ = write!(
        html,
        "            <div class=\"detail-row\">\n                <div class=\"detail-label\">{}:</div>\n                <div class=\"detail-value\">{}</div>\n            </div>\n",
        escape_html(label),
        value_html
    );
}

/// Only http(s) links become anchors; anything else is shown as text.
fn link_html(url: &str) -> String {
    let lower = url.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        format!("<a href=\"{0}\">{0}</a>", escape_html(url.trim()))
    } else {
        escape_html(url)
    }
}

fn task_links(html: &mut String, heading: &str, records: &[TaskRecord]) {
    if records.is_empty() {
        return;
    }
    let _ = writeln!(html, "            <p><strong>{}:</strong></p>\n            <ul>", escape_html(heading));
    for record in records {
        let project = if record.project_name.is_empty() {
            String::new()
        } else {
            format!(" ({})", escape_html(&record.project_name))
        };
        let _ = writeln!(
            html,
            "                <li><a href=\"{}\">{}</a>{}</li>",
            escape_html(&record.url),
            escape_html(&record.title),
            project
        );
    }
    html.push_str("            </ul>\n");
}

fn render_card(html: &mut String, result: &NameEvaluationResult) {
    let notation = if result.notation.is_empty() {
        "(no notation)"
    } else {
        result.notation.as_str()
    };

    let _ = write!(
        html,
        r#"    <div class="name-card">
        <div class="name-header">
            <div class="name-title">{} → {}</div>
            <div class="score {}">{}/100</div>
        </div>
        <div class="details">
"#,
        escape_html(&result.name),
        escape_html(notation),
        score_class(result.overall_score),
        result.overall_score
    );

    detail_row(html, "Direction", &escape_html(result.direction.code()));

    if !result.rule_scores.is_empty() {
        let scores = result
            .rule_scores
            .iter()
            .map(|(rule, score)| format!("{}: {}/100", escape_html(rule), score))
            .collect::<Vec<_>>()
            .join("<br>");
        detail_row(html, "Rule Scores", &scores);
    }

    if !result.verification_sources.is_empty() {
        let tags = result
            .verification_sources
            .iter()
            .map(|s| format!("<span class=\"tag\">{}</span>", escape_html(s)))
            .collect::<String>();
        detail_row(html, "Verification Sources", &tags);
    }

    if let Some(guide) = &result.pronunciation_guide {
        detail_row(html, "Pronunciation Guide", &escape_html(guide));
    }

    if !result.termbase_entry.is_empty() {
        let entry = result
            .termbase_entry
            .iter()
            .map(|(k, v)| format!("<strong>{}</strong>: {}", escape_html(k), escape_html(v)))
            .collect::<Vec<_>>()
            .join("<br>");
        detail_row(html, "Termbase Entry", &entry);
    }

    if !result.reference_links.is_empty() {
        let links = result
            .reference_links
            .iter()
            .map(|l| link_html(l))
            .collect::<Vec<_>>()
            .join("<br>");
        detail_row(html, "Reference Links", &links);
    }

    html.push_str("        </div>\n");

    // Compliance checks
    html.push_str("        <div class=\"compliance\">\n");
    let checks = [
        ("Romanization", result.romanization_compliant),
        ("Hyphenation", result.hyphenation_compliant),
        ("Capitalization", result.capitalization_compliant),
    ];
    for (label, value) in checks {
        if let Some(ok) = value {
            let _ = writeln!(html, "            <div>{}: {}</div>", label, check_mark(ok));
        }
    }
    let _ = writeln!(
        html,
        "            <div>Overall Compliance: {}</div>",
        check_mark(result.compliant)
    );
    if let Some(claimed) = result.model_claimed_compliant.filter(|_| result.verdict_disagrees()) {
        let _ = writeln!(
            html,
            "            <div>Model verdict: {} (overridden by score)</div>",
            check_mark(claimed)
        );
    }
    html.push_str("        </div>\n");

    if !result.recommendations.is_empty() || !result.verification_process.is_empty() {
        html.push_str("        <div class=\"recommendations\">\n");
        if !result.verification_process.is_empty() {
            html.push_str("            <h3>Verification Process</h3>\n            <ul>\n");
            for step in &result.verification_process {
                let _ = writeln!(html, "                <li>{}</li>", escape_html(step));
            }
            html.push_str("            </ul>\n");
        }
        if !result.recommendations.is_empty() {
            html.push_str("            <h3>Recommendations</h3>\n            <ul>\n");
            for rec in &result.recommendations {
                let _ = writeln!(html, "                <li>{}</li>", escape_html(rec));
            }
            html.push_str("            </ul>\n");
        }
        html.push_str("        </div>\n");
    }

    if result.error.is_some() || result.notes.is_some() {
        html.push_str("        <div class=\"notes\">\n");
        if let Some(error) = &result.error {
            let _ = writeln!(html, "            <strong>Error:</strong> {}", escape_html(error));
        }
        if let Some(notes) = &result.notes {
            let _ = writeln!(html, "            <strong>Notes:</strong> {}", escape_html(notes));
        }
        html.push_str("        </div>\n");
    }

    if let Some(tw) = &result.teamwork_verification {
        html.push_str("        <div class=\"teamwork\">\n            <h3>Teamwork Verification</h3>\n");
        let _ = writeln!(html, "            <p>Status: {}</p>", escape_html(&tw.status));
        if let Some(error) = &tw.error {
            let _ = writeln!(html, "            <p>Error: {}</p>", escape_html(error));
        }
        task_links(html, "Previous evaluations", &tw.previous_evaluations);
        task_links(html, "Previous translations", &tw.previous_translations);
        html.push_str("        </div>\n");
    }

    html.push_str("    </div>\n");
}

/// Standalone HTML document with one card per result, in input order.
pub fn render_html(results: &[NameEvaluationResult], title: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    <title>{0}</title>\n    <style>\n{1}    </style>\n</head>\n<body>\n    <h1>{0}</h1>\n",
        escape_html(title),
        HTML_STYLE
    );

    if results.is_empty() {
        html.push_str("    <p>No names were evaluated.</p>\n");
    }
    for result in results {
        render_card(&mut html, result);
    }

    html.push_str("</body>\n</html>\n");
    html
}

pub fn write_html_report(path: &Path, results: &[NameEvaluationResult], title: &str) -> Result<()> {
    write_file(path, &render_html(results, title))
}

// ==================== Termbase ====================

pub fn termbase_title(direction: Direction) -> String {
    format!(
        "{} to {} Termbase Entries",
        direction.source_language(),
        direction.target_language()
    )
}

/// Markdown Termbase blocks. Results without a notation are skipped.
pub fn render_termbase_entries(results: &[NameEvaluationResult], direction: Direction) -> String {
    let mut text = format!("# {}\n\n", termbase_title(direction));

    for result in results.iter().filter(|r| !r.notation.is_empty()) {
        let _ = write!(text, "## {} → {}\n\n", result.name, result.notation);

        if !result.termbase_entry.is_empty() {
            text.push_str("### Termbase Entry\n");
            for (key, value) in &result.termbase_entry {
                let _ = writeln!(text, "- **{}**: {}", key, value);
            }
            text.push('\n');
        }

        if !result.verification_sources.is_empty() {
            text.push_str("### Verification Sources\n");
            for source in &result.verification_sources {
                let _ = writeln!(text, "- {}", source);
            }
            text.push('\n');
        }

        if let Some(guide) = &result.pronunciation_guide {
            let _ = write!(text, "### Pronunciation Guide\n\n{}\n\n", guide);
        }

        if !result.reference_links.is_empty() {
            text.push_str("### Reference Links\n");
            for link in &result.reference_links {
                let _ = writeln!(text, "- {}", link);
            }
            text.push('\n');
        }

        let _ = write!(text, "### Compliance Score: {}/100\n\n", result.overall_score);

        if !result.recommendations.is_empty() {
            text.push_str("### Recommendations\n");
            for rec in &result.recommendations {
                let _ = writeln!(text, "- {}", rec);
            }
            text.push('\n');
        }

        text.push_str("---\n\n");
    }

    text
}

pub fn write_termbase_entries(
    path: &Path,
    results: &[NameEvaluationResult],
    direction: Direction,
) -> Result<()> {
    write_file(path, &render_termbase_entries(results, direction))
}

// ==================== Summary ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_names: usize,
    pub ko_en_count: usize,
    pub en_ko_count: usize,
    pub ko_en_compliant: usize,
    pub en_ko_compliant: usize,
    pub failed_count: usize,
    pub average_score: f64,
    pub real_person_mode: bool,
    pub timestamp: String,
}

impl BatchSummary {
    pub fn from_results(
        ko_en: &[NameEvaluationResult],
        en_ko: &[NameEvaluationResult],
        real_person_mode: bool,
        at: DateTime<Utc>,
    ) -> Self {
        let total = ko_en.len() + en_ko.len();
        let score_sum: u64 = ko_en
            .iter()
            .chain(en_ko)
            .map(|r| u64::from(r.overall_score))
            .sum();
        let average_score = if total == 0 {
            0.0
        } else {
            // One decimal place
            (score_sum as f64 / total as f64 * 10.0).round() / 10.0
        };

        Self {
            total_names: total,
            ko_en_count: ko_en.len(),
            en_ko_count: en_ko.len(),
            ko_en_compliant: ko_en.iter().filter(|r| r.compliant).count(),
            en_ko_compliant: en_ko.iter().filter(|r| r.compliant).count(),
            failed_count: ko_en.iter().chain(en_ko).filter(|r| r.error.is_some()).count(),
            average_score,
            real_person_mode,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn compliant_count(&self) -> usize {
        self.ko_en_compliant + self.en_ko_compliant
    }
}

pub fn write_summary(path: &Path, summary: &BatchSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    write_file(path, &json)
}

/// Console summary printed after a batch
pub fn render_text_summary(summary: &BatchSummary) -> String {
    let mut text = String::from("\nEVALUATION SUMMARY\n==================\n");
    let _ = writeln!(text, "Total names processed: {}", summary.total_names);
    let _ = writeln!(
        text,
        "Korean names (KO-EN): {} ({} compliant)",
        summary.ko_en_count, summary.ko_en_compliant
    );
    let _ = writeln!(
        text,
        "English names (EN-KO): {} ({} compliant)",
        summary.en_ko_count, summary.en_ko_compliant
    );
    let _ = writeln!(
        text,
        "Overall compliant: {}/{}",
        summary.compliant_count(),
        summary.total_names
    );
    let _ = writeln!(text, "Average score: {:.1}", summary.average_score);
    if summary.failed_count > 0 {
        let _ = writeln!(text, "Failed evaluations: {}", summary.failed_count);
    }
    text
}

/// Human label for real-person rules, used in console output
pub fn describe_real_person_rules(rules: &RealPersonRules) -> &'static str {
    match rules {
        RealPersonRules::KoEn {
            requires_expert_validation: true,
            ..
        } => "real person (expert validation required)",
        RealPersonRules::KoEn { .. } => "real person",
        RealPersonRules::EnKo { .. } => "real person (phonetician review required)",
    }
}
