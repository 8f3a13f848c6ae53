//! Batch pipeline: route names to a direction, evaluate them, optionally
//! record the outcome in Teamwork and write the reports.

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::direction::{detect_direction, partition_by_direction, Direction};
use crate::evaluator::NameEvaluator;
use crate::models::{NameEvaluationResult, RealPersonRules};
use crate::openai::ChatClient;
use crate::report::{
    self, direction_html_file, termbase_file, BatchSummary, COMBINED_HTML, RESULTS_JSON, SUMMARY_JSON,
};
use crate::teamwork::{PostTarget, Tracker};

/// Real person names need this score to skip expert validation
const EXPERT_VALIDATION_SCORE: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Detect the direction per name
    Auto,
    /// Send every name to one direction
    Fixed(Direction),
}

impl Routing {
    pub fn direction_for(&self, name: &str) -> Direction {
        match self {
            Routing::Auto => detect_direction(name),
            Routing::Fixed(direction) => *direction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub routing: Routing,
    pub real_person: bool,
    /// Record each result in Teamwork when set
    pub post_target: Option<PostTarget>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            routing: Routing::Auto,
            real_person: false,
            post_target: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Every result, in input order
    pub results: Vec<NameEvaluationResult>,
    pub ko_en: Vec<NameEvaluationResult>,
    pub en_ko: Vec<NameEvaluationResult>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    fn new(results: Vec<NameEvaluationResult>, real_person: bool) -> Self {
        let (ko_en, en_ko): (Vec<_>, Vec<_>) = results
            .iter()
            .cloned()
            .partition(|r| r.direction == Direction::KoEn);
        let summary = BatchSummary::from_results(&ko_en, &en_ko, real_person, Utc::now());

        Self {
            results,
            ko_en,
            en_ko,
            summary,
        }
    }

    pub fn for_direction(&self, direction: Direction) -> &[NameEvaluationResult] {
        match direction {
            Direction::KoEn => &self.ko_en,
            Direction::EnKo => &self.en_ko,
        }
    }

    /// True when every processed name came out compliant
    pub fn all_compliant(&self) -> bool {
        self.results.iter().all(|r| r.compliant)
    }
}

/// Where the reports of one batch go
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub output_dir: PathBuf,
    pub combined_html: PathBuf,
    pub results_json: PathBuf,
}

impl ReportPaths {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            combined_html: output_dir.join(COMBINED_HTML),
            results_json: output_dir.join(RESULTS_JSON),
            output_dir,
        }
    }

    pub fn with_overrides(mut self, html: Option<PathBuf>, json: Option<PathBuf>) -> Self {
        if let Some(html) = html {
            self.combined_html = html;
        }
        if let Some(json) = json {
            self.results_json = json;
        }
        self
    }
}

pub struct Orchestrator {
    ko_en: NameEvaluator,
    en_ko: NameEvaluator,
    tracker: Tracker,
    concurrency: usize,
}

impl Orchestrator {
    /// Build evaluators for both directions. `verify_in_tracker` controls the
    /// pre-evaluation Teamwork lookup; posting uses `tracker` regardless.
    pub fn new(
        http: reqwest::Client,
        config: &Config,
        tracker: Tracker,
        verify_in_tracker: bool,
    ) -> Result<Self> {
        let chat = ChatClient::from_config(http, config)?;
        let lookup = if verify_in_tracker {
            tracker.clone()
        } else {
            Tracker::Disabled
        };

        info!(
            "Using model {} (concurrency {}, threshold {})",
            chat.model(),
            config.concurrency,
            config.compliance_threshold
        );

        Ok(Self {
            ko_en: NameEvaluator::new(Direction::KoEn, chat.clone(), lookup.clone(), config),
            en_ko: NameEvaluator::new(Direction::EnKo, chat, lookup, config),
            tracker,
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn evaluator(&self, direction: Direction) -> &NameEvaluator {
        match direction {
            Direction::KoEn => &self.ko_en,
            Direction::EnKo => &self.en_ko,
        }
    }

    /// Evaluate one name. Errors are recorded on the result, never returned.
    async fn process_one(&self, name: &str, options: &BatchOptions) -> NameEvaluationResult {
        let direction = options.routing.direction_for(name);
        info!("Evaluating '{}' ({})", name, direction);

        let mut result = match self.evaluator(direction).evaluate(name).await {
            Ok(result) => result,
            Err(e) => {
                error!("Evaluation failed for '{}': {:#}", name, e);
                NameEvaluationResult::failed(name, direction, format!("{:#}", e))
            }
        };

        if options.real_person {
            apply_real_person_rules(&mut result);
        }

        result
    }

    pub async fn process_names(&self, names: &[String], options: &BatchOptions) -> BatchOutcome {
        if options.routing == Routing::Auto {
            let (korean, english) = partition_by_direction(names);
            info!(
                "Auto-detected {} Korean and {} English name(s)",
                korean.len(),
                english.len()
            );
        }

        // `buffered` keeps results in input order whatever the concurrency
        let results: Vec<NameEvaluationResult> = stream::iter(names)
            .map(|name| self.process_one(name, options))
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(target) = &options.post_target {
            self.post_results(&results, target).await;
        }

        BatchOutcome::new(results, options.real_person)
    }

    async fn post_results(&self, results: &[NameEvaluationResult], target: &PostTarget) {
        if !self.tracker.is_enabled() {
            warn!("Posting requested but Teamwork integration is disabled");
            return;
        }

        for result in results.iter().filter(|r| r.error.is_none()) {
            let outcome = self.tracker.post(result, target).await;
            if outcome.success {
                info!("Posted '{}': {}", result.name, outcome.message);
            } else {
                warn!("Failed to post '{}': {}", result.name, outcome.message);
            }
        }
    }
}

/// Append the real-person recommendations and record which rules apply.
pub fn apply_real_person_rules(result: &mut NameEvaluationResult) {
    match result.direction {
        Direction::KoEn => {
            result.real_person_rules = Some(RealPersonRules::KoEn {
                hyphenation_required: true,
                capitalization_standard: "First letter capitalized, rest lowercase".to_string(),
                nikl_compliance_required: true,
                requires_expert_validation: result.overall_score < EXPERT_VALIDATION_SCORE,
            });
            result
                .recommendations
                .push("For real person names, hyphenation is mandatory between syllables".to_string());
            result
                .recommendations
                .push("Verify with multiple official sources including NIKL standards".to_string());
            if result.teamwork_verification.as_ref().is_some_and(|tw| tw.found) {
                result.recommendations.push(
                    "Follow existing verified translations in Teamwork for consistency".to_string(),
                );
            }
        }
        Direction::EnKo => {
            // Netflix work goes through Kyonshik; detect it from prior Teamwork projects
            let netflix_project = result.teamwork_verification.as_ref().is_some_and(|tw| {
                tw.previous_evaluations
                    .iter()
                    .chain(&tw.previous_translations)
                    .any(|t| t.project_name.to_lowercase().contains("netflix"))
            });
            result.real_person_rules = Some(RealPersonRules::EnKo {
                requires_phonetician_review: true,
                requires_kyonshik_confirmation: netflix_project,
                record_hz_notation: true,
                apply_strict_transliteration: true,
            });
            result.recommendations.push(
                "For real person names created after 08/11/2020, confirm notation through Kyonshik for NF tasks"
                    .to_string(),
            );
            result
                .recommendations
                .push("For non-NF projects, confirm through Hazel (phonetician)".to_string());
            result.recommendations.push(
                "Record 'HZ Original Notation' in the Korean target of the Termbase".to_string(),
            );
        }
    }
}

fn report_title(direction: Direction, real_person: bool) -> String {
    let base = match direction {
        Direction::KoEn => "Korean to English Name Evaluation Report",
        Direction::EnKo => "English to Korean Name Evaluation Report",
    };
    if real_person {
        format!("{} (Real Persons)", base)
    } else {
        base.to_string()
    }
}

/// Write every report for a batch and return the files written.
pub fn write_reports(outcome: &BatchOutcome, paths: &ReportPaths) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let real_person = outcome.summary.real_person_mode;

    report::write_json_report(&paths.results_json, &outcome.results)?;
    written.push(paths.results_json.clone());

    for direction in Direction::ALL {
        let results = outcome.for_direction(direction);
        if results.is_empty() {
            continue;
        }

        let html = paths.output_dir.join(direction_html_file(direction));
        report::write_html_report(&html, results, &report_title(direction, real_person))?;
        written.push(html);

        let termbase = paths.output_dir.join(termbase_file(direction));
        report::write_termbase_entries(&termbase, results, direction)?;
        written.push(termbase);
    }

    report::write_html_report(&paths.combined_html, &outcome.results, "Name Evaluation Report")?;
    written.push(paths.combined_html.clone());

    let summary = paths.output_dir.join(SUMMARY_JSON);
    report::write_summary(&summary, &outcome.summary)?;
    written.push(summary);

    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::{TaskRecord, TeamworkVerification};
    use tempfile::TempDir;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    // ==================== Helper Functions ====================

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    async fn mount_reply(server: &MockServer, name: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains(format!("\\\"{}\\\"", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
            .mount(server)
            .await;
    }

    fn orchestrator_for(server: &MockServer, concurrency: usize) -> Orchestrator {
        let config = test_config(&format!("{}/v1/chat/completions", server.uri()), None);
        Orchestrator::new(reqwest::Client::new(), &config, Tracker::Disabled, false)
            .unwrap()
            .with_concurrency(concurrency)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // ==================== Routing ====================

    #[test]
    fn test_routing() {
        assert_eq!(Routing::Auto.direction_for("김지원"), Direction::KoEn);
        assert_eq!(Routing::Auto.direction_for("John Smith"), Direction::EnKo);
        assert_eq!(Routing::Fixed(Direction::KoEn).direction_for("John Smith"), Direction::KoEn);
    }

    #[tokio::test]
    async fn test_auto_routing_end_to_end() {
        let server = MockServer::start().await;
        mount_reply(&server, "John Smith", r#"{"korean_notation":"존 스미스","overall_score":90}"#).await;
        mount_reply(&server, "김지원", r#"{"english_notation":"Kim Ji-won","overall_score":95}"#).await;

        let outcome = orchestrator_for(&server, 1)
            .process_names(&names(&["John Smith", "김지원"]), &BatchOptions::default())
            .await;

        assert_eq!(outcome.summary.ko_en_count, 1);
        assert_eq!(outcome.summary.en_ko_count, 1);
        assert_eq!(outcome.en_ko[0].notation, "존 스미스");
        assert_eq!(outcome.ko_en[0].notation, "Kim Ji-won");
        assert_eq!(outcome.results[0].name, "John Smith");
        assert!(outcome.all_compliant());
    }

    // ==================== Failure Isolation ====================

    #[tokio::test]
    async fn test_failure_is_isolated_and_order_kept() {
        let server = MockServer::start().await;
        mount_reply(&server, "Alice Kim", r#"{"korean_notation":"앨리스 김","overall_score":88}"#).await;
        Mock::given(method("POST"))
            .and(body_string_contains("Bob Lee"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_reply(&server, "Carol Park", r#"{"korean_notation":"캐럴 박","overall_score":70}"#).await;

        let outcome = orchestrator_for(&server, 3)
            .process_names(
                &names(&["Alice Kim", "Bob Lee", "Carol Park"]),
                &BatchOptions::default(),
            )
            .await;

        let order: Vec<_> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, vec!["Alice Kim", "Bob Lee", "Carol Park"]);
        assert!(outcome.results[0].compliant);
        assert!(!outcome.results[1].compliant);
        assert!(outcome.results[1].error.as_deref().unwrap().contains("500"));
        assert!(!outcome.results[2].compliant);
        assert_eq!(outcome.summary.failed_count, 1);
        assert!(!outcome.all_compliant());
    }

    // ==================== Real Person Rules ====================

    #[test]
    fn test_real_person_rules_ko_en() {
        let mut result = NameEvaluationResult::new("김지원", Direction::KoEn);
        result.overall_score = 90;
        result.teamwork_verification = Some(TeamworkVerification::from_matches(
            vec![TaskRecord::default()],
            vec![],
        ));
        apply_real_person_rules(&mut result);

        assert!(matches!(
            result.real_person_rules,
            Some(RealPersonRules::KoEn {
                requires_expert_validation: true,
                ..
            })
        ));
        assert_eq!(result.recommendations.len(), 3);
        assert!(result.recommendations[0].contains("hyphenation is mandatory"));
        assert!(result.recommendations[2].contains("Follow existing verified translations"));
    }

    #[test]
    fn test_real_person_rules_en_ko() {
        let mut result = NameEvaluationResult::new("John Smith", Direction::EnKo);
        result.teamwork_verification = Some(TeamworkVerification::from_matches(
            vec![],
            vec![TaskRecord {
                project_name: "Netflix Original S2".to_string(),
                ..Default::default()
            }],
        ));
        apply_real_person_rules(&mut result);

        assert!(matches!(
            result.real_person_rules,
            Some(RealPersonRules::EnKo {
                requires_kyonshik_confirmation: true,
                ..
            })
        ));
        assert_eq!(result.recommendations.len(), 3);
        assert!(result.recommendations[1].contains("Hazel"));
    }

    #[tokio::test]
    async fn test_real_person_mode_in_batch() {
        let server = MockServer::start().await;
        mount_reply(&server, "김지원", r#"{"english_notation":"Kim Ji-won","overall_score":97}"#).await;

        let options = BatchOptions {
            real_person: true,
            ..Default::default()
        };
        let outcome = orchestrator_for(&server, 1)
            .process_names(&names(&["김지원"]), &options)
            .await;

        assert!(outcome.summary.real_person_mode);
        assert!(matches!(
            outcome.results[0].real_person_rules,
            Some(RealPersonRules::KoEn {
                requires_expert_validation: false,
                ..
            })
        ));
    }

    // ==================== Reports ====================

    #[test]
    fn test_write_reports_files() {
        let temp = TempDir::new().unwrap();
        let mut ko = NameEvaluationResult::new("김지원", Direction::KoEn);
        ko.notation = "Kim Ji-won".to_string();
        let outcome = BatchOutcome::new(vec![ko], false);

        let paths = ReportPaths::new(temp.path());
        let written = write_reports(&outcome, &paths).unwrap();

        assert!(temp.path().join(RESULTS_JSON).exists());
        assert!(temp.path().join("ko_en_evaluation_report.html").exists());
        assert!(temp.path().join("ko_en_termbase_entries.txt").exists());
        assert!(!temp.path().join("en_ko_evaluation_report.html").exists());
        assert!(temp.path().join(COMBINED_HTML).exists());
        assert!(temp.path().join(SUMMARY_JSON).exists());
        assert_eq!(written.len(), 5);
    }

    #[test]
    fn test_report_path_overrides() {
        let temp = TempDir::new().unwrap();
        let outcome = BatchOutcome::new(vec![], false);
        let html = temp.path().join("custom/report.html");
        let json = temp.path().join("custom/out.json");

        let paths = ReportPaths::new(temp.path().join("reports"))
            .with_overrides(Some(html.clone()), Some(json.clone()));
        write_reports(&outcome, &paths).unwrap();

        assert!(html.exists());
        assert!(json.exists());
        assert!(temp.path().join("reports").join(SUMMARY_JSON).exists());
    }
}
