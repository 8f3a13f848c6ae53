//! Best-effort recovery of evaluation fields from free-text model output.
//!
//! Everything here is heuristic. A miss leaves the field unset and is never an
//! error. Callers only see the [`ResponseExtractor`] trait, so the heuristics
//! can be swapped out without touching the evaluator.

use crate::direction::is_hangul_syllable;
use crate::models::{score_from_value, NameEvaluationResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Raw text in, partial record out.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> PartialEvaluation;
}

/// Fields recovered from a response. `None`/empty means "not found".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialEvaluation {
    pub notation: Option<String>,
    pub overall_score: Option<u8>,
    pub compliant: Option<bool>,
    pub model_claimed_compliant: Option<bool>,
    pub rule_scores: BTreeMap<String, u8>,
    pub verification_process: Vec<String>,
    pub verification_sources: Vec<String>,
    pub recommendations: Vec<String>,
    pub reference_links: Vec<String>,
    pub pronunciation_guide: Option<String>,
    pub termbase_entry: BTreeMap<String, String>,
    pub romanization_compliant: Option<bool>,
    pub hyphenation_compliant: Option<bool>,
    pub capitalization_compliant: Option<bool>,
}

impl PartialEvaluation {
    /// Overwrite only the fields that were found.
    pub fn apply_to(self, result: &mut NameEvaluationResult) {
        if let Some(notation) = self.notation {
            result.notation = notation;
        }
        if let Some(score) = self.overall_score {
            result.overall_score = score;
        }
        if let Some(compliant) = self.compliant {
            result.compliant = compliant;
        }
        if self.model_claimed_compliant.is_some() {
            result.model_claimed_compliant = self.model_claimed_compliant;
        }
        if !self.rule_scores.is_empty() {
            result.rule_scores = self.rule_scores;
        }
        if !self.verification_process.is_empty() {
            result.verification_process = self.verification_process;
        }
        if !self.verification_sources.is_empty() {
            result.verification_sources = self.verification_sources;
        }
        if !self.recommendations.is_empty() {
            result.recommendations = self.recommendations;
        }
        if !self.reference_links.is_empty() {
            result.reference_links = self.reference_links;
        }
        if self.pronunciation_guide.is_some() {
            result.pronunciation_guide = self.pronunciation_guide;
        }
        if !self.termbase_entry.is_empty() {
            result.termbase_entry = self.termbase_entry;
        }
        if self.romanization_compliant.is_some() {
            result.romanization_compliant = self.romanization_compliant;
        }
        if self.hyphenation_compliant.is_some() {
            result.hyphenation_compliant = self.hyphenation_compliant;
        }
        if self.capitalization_compliant.is_some() {
            result.capitalization_compliant = self.capitalization_compliant;
        }
    }

    /// Take every field `other` found, keeping ours otherwise.
    fn overlay(&mut self, other: PartialEvaluation) {
        macro_rules! take_opt {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        macro_rules! take_collection {
            ($($field:ident),*) => {
                $(if !other.$field.is_empty() { self.$field = other.$field; })*
            };
        }

        take_opt!(
            notation,
            overall_score,
            compliant,
            model_claimed_compliant,
            pronunciation_guide,
            romanization_compliant,
            hyphenation_compliant,
            capitalization_compliant
        );
        take_collection!(
            rule_scores,
            verification_process,
            verification_sources,
            recommendations,
            reference_links,
            termbase_entry
        );
    }
}

const NOTATION_MARKERS: &[&str] = &[
    "korean notation",
    "english notation",
    "recommended notation",
    "hangul",
    "한글 표기",
    "romanization",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Process,
    Recommendations,
    Sources,
}

impl Section {
    fn from_heading(lower: &str) -> Option<Self> {
        if lower.contains("verification process") || lower.contains("verified using") {
            Some(Section::Process)
        } else if lower.contains("recommend") || lower.contains("suggestion") {
            Some(Section::Recommendations)
        } else if lower.contains("sources") || lower.contains("references") {
            Some(Section::Sources)
        } else {
            None
        }
    }
}

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();
static NOTATION_FIELD_REGEX: OnceLock<Regex> = OnceLock::new();
static COMPLIANT_FIELD_REGEX: OnceLock<Regex> = OnceLock::new();
static SCORE_FIELD_REGEX: OnceLock<Regex> = OnceLock::new();

/// Line-scanning extractor with a JSON override.
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    threshold: u8,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new(80)
    }
}

impl HeuristicExtractor {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    fn extract_notation(lines: &[&str]) -> Option<String> {
        for (i, line) in lines.iter().enumerate() {
            let lower = line.to_lowercase();
            if !NOTATION_MARKERS.iter().any(|m| lower.contains(m)) {
                continue;
            }

            // A bare "**Korean notation:**" heading keeps its value on the next line
            if let Some((_, after)) = line.split_once(':') {
                let value = clean_value(after);
                if !value.is_empty() {
                    return Some(value);
                }
            }
            if let Some(&next) = lines.get(i + 1) {
                if next.chars().any(is_hangul_syllable) {
                    let value = clean_value(strip_bullet(next).unwrap_or(next));
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    /// Only tokens after the keyword count, so a list ordinal like `3.` is never a score.
    fn extract_score(lines: &[&str]) -> Option<u8> {
        lines.iter().find_map(|line| {
            // ASCII lowercasing keeps byte offsets valid for slicing
            let lower = line.to_ascii_lowercase();
            let start = ["score", "compliance"]
                .iter()
                .filter_map(|keyword| lower.find(keyword))
                .min()?;
            line[start..].split_whitespace().find_map(parse_score_token)
        })
    }

    fn extract_sections(lines: &[&str], partial: &mut PartialEvaluation) {
        let mut current: Option<Section> = None;

        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                current = None;
                continue;
            }

            if let Some(item) = strip_bullet(trimmed) {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                match current {
                    Some(Section::Process) => partial.verification_process.push(item.to_string()),
                    Some(Section::Recommendations) => partial.recommendations.push(item.to_string()),
                    Some(Section::Sources) => partial.verification_sources.push(item.to_string()),
                    None => {}
                }
                continue;
            }

            // Notation and score lines belong to their own sections
            let lower = trimmed.to_lowercase();
            current = if lower.contains("notation") || lower.contains("score") {
                None
            } else {
                Section::from_heading(&lower).or(current)
            };
        }
    }

    fn extract_json(raw: &str) -> Option<PartialEvaluation> {
        let fence = FENCE_REGEX.get_or_init(|| Regex::new(r"(?s)```(?:json)?(.*?)```").unwrap());

        let candidate = match fence.captures(raw).and_then(|c| c.get(1)) {
            Some(body) => body.as_str().trim(),
            None => {
                let start = raw.find('{')?;
                let end = raw.rfind('}')?;
                if end <= start {
                    return None;
                }
                &raw[start..=end]
            }
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(partial_from_json(&map)),
            _ => Some(Self::extract_json_fields_by_regex(raw)),
        }
    }

    /// Last resort for JSON-looking text that does not parse.
    fn extract_json_fields_by_regex(raw: &str) -> PartialEvaluation {
        let notation_re = NOTATION_FIELD_REGEX.get_or_init(|| {
            Regex::new(r#""(?:english_|korean_)?notation"\s*:\s*"([^"]+)""#).unwrap()
        });
        let compliant_re = COMPLIANT_FIELD_REGEX
            .get_or_init(|| Regex::new(r#"(?i)"compliant"\s*:\s*(true|false)"#).unwrap());
        let score_re =
            SCORE_FIELD_REGEX.get_or_init(|| Regex::new(r#""overall_score"\s*:\s*(\d+)"#).unwrap());

        let claimed = compliant_re
            .captures(raw)
            .map(|c| c[1].eq_ignore_ascii_case("true"));

        PartialEvaluation {
            notation: notation_re.captures(raw).map(|c| c[1].trim().to_string()),
            overall_score: score_re
                .captures(raw)
                .and_then(|c| c[1].parse::<u64>().ok())
                .map(|s| s.min(100) as u8),
            compliant: claimed,
            model_claimed_compliant: claimed,
            ..Default::default()
        }
    }
}

impl ResponseExtractor for HeuristicExtractor {
    fn extract(&self, raw: &str) -> PartialEvaluation {
        let lines: Vec<&str> = raw.lines().collect();
        let mut partial = PartialEvaluation {
            notation: Self::extract_notation(&lines),
            ..Default::default()
        };

        if let Some(score) = Self::extract_score(&lines) {
            partial.overall_score = Some(score);
            partial.compliant = Some(score >= self.threshold);
        }

        Self::extract_sections(&lines, &mut partial);

        if let Some(json) = Self::extract_json(raw) {
            partial.overlay(json);
        }

        partial
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    let line = line.trim_start();
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .or_else(|| (line == "-" || line == "*" || line == "•").then_some(""))
}

/// Trim whitespace, markdown emphasis and quotes from a value.
fn clean_value(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .to_string()
}

/// `92`, `92.`, `45%`, `92/100` and similar
fn parse_score_token(token: &str) -> Option<u8> {
    let token = token.trim_end_matches(['.', ',', ';', ':', ')']);
    let token = token.strip_suffix("/100").unwrap_or(token);
    let digits = token.strip_suffix('%').unwrap_or(token);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    // Overlong digit runs saturate
    let score = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(score.min(100) as u8)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn score_map(map: &Map<String, Value>) -> BTreeMap<String, u8> {
    map.iter()
        .filter_map(|(k, v)| score_from_value(v).map(|s| (k.clone(), s)))
        .collect()
}

fn partial_from_json(map: &Map<String, Value>) -> PartialEvaluation {
    let text = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let flag = |key: &str| map.get(key).and_then(Value::as_bool);

    let claimed = flag("compliant");
    let mut partial = PartialEvaluation {
        notation: text("english_notation")
            .or_else(|| text("korean_notation"))
            .or_else(|| text("notation")),
        overall_score: map.get("overall_score").and_then(score_from_value),
        compliant: claimed,
        model_claimed_compliant: claimed,
        verification_sources: string_list(map.get("verification_sources")),
        recommendations: string_list(map.get("recommendations")),
        reference_links: string_list(map.get("reference_links")),
        pronunciation_guide: text("pronunciation_guide"),
        romanization_compliant: flag("romanization_compliant"),
        hyphenation_compliant: flag("hyphenation_compliant"),
        capitalization_compliant: flag("capitalization_compliant"),
        ..Default::default()
    };

    if let Some(Value::Object(scores)) = map.get("rule_scores") {
        partial.rule_scores = score_map(scores);
    }
    match map.get("verification_process") {
        Some(Value::Object(scores)) => {
            for (step, score) in score_map(scores) {
                partial.rule_scores.entry(step).or_insert(score);
            }
        }
        other => partial.verification_process = string_list(other),
    }
    if let Some(Value::Object(entry)) = map.get("termbase_entry") {
        partial.termbase_entry = entry
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
    }

    partial
}
