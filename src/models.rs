//! Evaluation records shared by the evaluator, Teamwork client and reports.

use crate::direction::Direction;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of evaluating one name in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameEvaluationResult {
    pub name: String,
    pub direction: Direction,
    pub notation: String,
    pub compliant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_claimed_compliant: Option<bool>,
    pub overall_score: u8,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_scores: BTreeMap<String, u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verification_sources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verification_process: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation_guide: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub termbase_entry: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub romanization_compliant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyphenation_compliant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capitalization_compliant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_person_rules: Option<RealPersonRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teamwork_verification: Option<TeamworkVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for NameEvaluationResult {
    fn default() -> Self {
        Self::new("", Direction::KoEn)
    }
}

impl NameEvaluationResult {
    /// Empty, non-compliant record for a name
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            notation: String::new(),
            compliant: false,
            model_claimed_compliant: None,
            overall_score: 0,
            rule_scores: BTreeMap::new(),
            verification_sources: Vec::new(),
            recommendations: Vec::new(),
            verification_process: Vec::new(),
            reference_links: Vec::new(),
            pronunciation_guide: None,
            termbase_entry: BTreeMap::new(),
            romanization_compliant: None,
            hyphenation_compliant: None,
            capitalization_compliant: None,
            real_person_rules: None,
            teamwork_verification: None,
            notes: None,
            error: None,
        }
    }

    /// Entry for a name whose evaluation could not be completed
    pub fn failed(name: impl Into<String>, direction: Direction, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(name, direction)
        }
    }

    /// Recompute `compliant` from the score. The score is the only authority.
    pub fn apply_threshold(&mut self, threshold: u8) {
        self.compliant = self.error.is_none() && self.overall_score >= threshold;
    }

    /// Whether the model's own verdict disagrees with the score-derived one
    pub fn verdict_disagrees(&self) -> bool {
        self.model_claimed_compliant
            .is_some_and(|claimed| claimed != self.compliant)
    }
}

/// Extra rules recorded when a name belongs to a real person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RealPersonRules {
    KoEn {
        hyphenation_required: bool,
        capitalization_standard: String,
        nikl_compliance_required: bool,
        requires_expert_validation: bool,
    },
    EnKo {
        requires_phonetician_review: bool,
        requires_kyonshik_confirmation: bool,
        record_hz_notation: bool,
        apply_strict_transliteration: bool,
    },
}

/// A Teamwork task as surfaced in verification results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub project_id: String,
    pub project_name: String,
    pub created_at: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamworkVerification {
    pub found: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previous_translations: Vec<TaskRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previous_evaluations: Vec<TaskRecord>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const STATUS_VERIFIED: &str = "Verified - previous evaluations found";
pub const STATUS_PRIOR_TRANSLATIONS: &str = "Prior translations found - detailed verification needed";
pub const STATUS_NOT_FOUND: &str = "Not found in Teamwork records";
pub const STATUS_ERROR: &str = "Error - could not verify";

impl TeamworkVerification {
    /// Classify search hits into evaluations and plain translations.
    pub fn from_matches(evaluations: Vec<TaskRecord>, translations: Vec<TaskRecord>) -> Self {
        let status = if !evaluations.is_empty() {
            STATUS_VERIFIED
        } else if !translations.is_empty() {
            STATUS_PRIOR_TRANSLATIONS
        } else {
            STATUS_NOT_FOUND
        };

        Self {
            found: !evaluations.is_empty() || !translations.is_empty(),
            previous_translations: translations,
            previous_evaluations: evaluations,
            status: status.to_string(),
            error: None,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            found: false,
            status: STATUS_ERROR.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// JSON body the model returns on the structured path.
///
/// The notation and overall score are required; anything else may be missing.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredEvaluation {
    #[serde(alias = "english_notation", alias = "korean_notation")]
    pub notation: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub overall_score: u8,
    #[serde(default)]
    pub compliant: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_score_map")]
    pub rule_scores: BTreeMap<String, u8>,
    /// Either a list of steps or an object of per-step scores
    #[serde(default)]
    pub verification_process: Option<Value>,
    #[serde(default)]
    pub verification_sources: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub reference_links: Option<Vec<String>>,
    #[serde(default)]
    pub pronunciation_guide: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_map")]
    pub termbase_entry: BTreeMap<String, String>,
    #[serde(default)]
    pub romanization_compliant: Option<bool>,
    #[serde(default)]
    pub hyphenation_compliant: Option<bool>,
    #[serde(default)]
    pub capitalization_compliant: Option<bool>,
}

impl StructuredEvaluation {
    pub fn into_result(self, name: &str, direction: Direction) -> NameEvaluationResult {
        let mut result = NameEvaluationResult::new(name, direction);
        result.notation = self.notation.trim().to_string();
        result.overall_score = self.overall_score;
        result.compliant = self.compliant.unwrap_or(false);
        result.model_claimed_compliant = self.compliant;
        result.rule_scores = self.rule_scores;
        result.verification_sources = self.verification_sources;
        result.recommendations = self.recommendations;
        result.reference_links = self.reference_links.unwrap_or_default();
        result.pronunciation_guide = self.pronunciation_guide.filter(|p| !p.trim().is_empty());
        result.termbase_entry = self.termbase_entry;
        result.romanization_compliant = self.romanization_compliant;
        result.hyphenation_compliant = self.hyphenation_compliant;
        result.capitalization_compliant = self.capitalization_compliant;

        match self.verification_process {
            Some(Value::Object(map)) => {
                for (step, value) in map {
                    if let Some(score) = score_from_value(&value) {
                        result.rule_scores.entry(step).or_insert(score);
                    }
                }
            }
            Some(Value::Array(steps)) => {
                result.verification_process = steps
                    .iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect();
            }
            _ => {}
        }

        result
    }
}

/// Read a 0-100 score from a JSON number or numeric string, clamping into range.
pub fn score_from_value(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(clamp_score(raw))
}

pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        0
    } else {
        raw.round().clamp(0.0, 100.0) as u8
    }
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    score_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid score: {}", value)))
}

fn deserialize_score_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| score_from_value(&v).map(|s| (k, s)))
        .collect())
}

fn deserialize_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, text)
        })
        .collect())
}
