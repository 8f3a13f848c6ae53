use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::direction::Direction;
use crate::extract::{HeuristicExtractor, ResponseExtractor};
use crate::models::{NameEvaluationResult, StructuredEvaluation};
use crate::openai::ChatClient;
use crate::prompt::{build_prompt, plain_text_prompt, PromptInput};
use crate::resources::ResourceRegistry;
use crate::teamwork::Tracker;

/// Evaluates names for one direction.
///
/// Structured JSON is tried first. Any failure there (transport, empty reply,
/// schema mismatch) falls back to a single plain-text request that is run
/// through the extractor. If that request fails too, the error is returned.
#[derive(Clone)]
pub struct NameEvaluator {
    direction: Direction,
    chat: ChatClient,
    tracker: Tracker,
    extractor: Arc<dyn ResponseExtractor>,
    threshold: u8,
}

impl NameEvaluator {
    pub fn new(direction: Direction, chat: ChatClient, tracker: Tracker, config: &Config) -> Self {
        Self {
            direction,
            chat,
            tracker,
            extractor: Arc::new(HeuristicExtractor::new(config.compliance_threshold)),
            threshold: config.compliance_threshold,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ResponseExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub async fn evaluate(&self, name: &str) -> Result<NameEvaluationResult> {
        let prior = self.tracker.verify(name).await;

        let resources = ResourceRegistry::get().for_direction(self.direction);
        let input = PromptInput {
            name,
            direction: self.direction,
            resources: &resources,
            prior: prior.as_ref(),
        };

        let mut result = match self.evaluate_structured(&input).await {
            Ok(structured) => structured.into_result(name, self.direction),
            Err(e) => {
                warn!(
                    "Structured evaluation failed for '{}' ({}), falling back to plain text: {:#}",
                    name, self.direction, e
                );
                self.evaluate_plain_text(&input, &e).await?
            }
        };

        result.teamwork_verification = prior;
        result.apply_threshold(self.threshold);

        if result.verdict_disagrees() {
            debug!(
                "Model verdict for '{}' disagrees with score {} (threshold {})",
                name, result.overall_score, self.threshold
            );
        }
        info!(
            "Evaluated '{}' ({}): notation='{}', score={}, compliant={}",
            name, self.direction, result.notation, result.overall_score, result.compliant
        );

        Ok(result)
    }

    async fn evaluate_structured(&self, input: &PromptInput<'_>) -> Result<StructuredEvaluation> {
        let raw = self.chat.complete_json(&build_prompt(input)).await?;
        serde_json::from_str(raw.trim()).context("Model response did not match the evaluation schema")
    }

    async fn evaluate_plain_text(
        &self,
        input: &PromptInput<'_>,
        structured_error: &anyhow::Error,
    ) -> Result<NameEvaluationResult> {
        let text = self
            .chat
            .complete_text(&plain_text_prompt(input))
            .await
            .with_context(|| format!("Plain-text evaluation failed for '{}'", input.name))?;

        let mut result = NameEvaluationResult::new(input.name, self.direction);
        self.extractor.extract(&text).apply_to(&mut result);
        result.notes = Some(format!(
            "Error in structured extraction ({:#}). Raw evaluation:\n{}",
            structured_error, text
        ));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::extract::PartialEvaluation;
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

    fn evaluator_for(server: &MockServer, direction: Direction) -> NameEvaluator {
        let config = test_config(&format!("{}/v1/chat/completions", server.uri()), None);
        let chat = ChatClient::from_config(reqwest::Client::new(), &config).unwrap();
        NameEvaluator::new(direction, chat, Tracker::Disabled, &config)
    }

    // ==================== Structured Path ====================

    #[tokio::test]
    async fn test_structured_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("json_object"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                r#"{"english_notation":"Kim Ji-won","compliant":true,"overall_score":97,"hyphenation_compliant":true}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let result = evaluator_for(&server, Direction::KoEn)
            .evaluate("김지원")
            .await
            .unwrap();

        assert_eq!(result.notation, "Kim Ji-won");
        assert_eq!(result.overall_score, 97);
        assert!(result.compliant);
        assert_eq!(result.hyphenation_compliant, Some(true));
        assert!(result.notes.is_none());
        assert!(result.teamwork_verification.is_none());
    }

    #[tokio::test]
    async fn test_threshold_overrides_model_claim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                r#"{"korean_notation":"존 스미스","compliant":true,"overall_score":60}"#,
            )))
            .mount(&server)
            .await;

        let result = evaluator_for(&server, Direction::EnKo)
            .evaluate("John Smith")
            .await
            .unwrap();

        assert!(!result.compliant);
        assert_eq!(result.model_claimed_compliant, Some(true));
    }

    // ==================== Fallback ====================

    #[tokio::test]
    async fn test_schema_mismatch_falls_back_to_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("json_object"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response(r#"{"unexpected": true}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                "Korean notation: 존 스미스\nCompliance score: 92\n\nRecommendations:\n- Confirm with Hazel",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let result = evaluator_for(&server, Direction::EnKo)
            .evaluate("John Smith")
            .await
            .unwrap();

        assert_eq!(result.notation, "존 스미스");
        assert_eq!(result.overall_score, 92);
        assert!(result.compliant);
        assert_eq!(result.recommendations, vec!["Confirm with Hazel"]);
        let notes = result.notes.unwrap();
        assert!(notes.starts_with("Error in structured extraction ("));
        assert!(notes.contains("Raw evaluation:\nKorean notation: 존 스미스"));
    }

    #[tokio::test]
    async fn test_fallback_reads_numbered_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("json_object"))
            .respond_with(ResponseTemplate::new(500).set_body_string("schema mode down"))
            .expect(1)
            .mount(&server)
            .await;
        // Same numbering the plain-text prompt asks for
        Mock::given(method("POST"))
            .and(body_string_contains("3. Compliance score"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                "1. Korean notation: 존 스미스\n\
                 2. Verification process:\n\
                 - Checked CF Teamwork\n\
                 - Checked NIKL loanword rules\n\
                 3. Compliance score: 92\n\
                 4. Recommendations:\n\
                 - Confirm with Hazel\n\
                 5. Sources:\n\
                 - NIKL\n\
                 - IMDb",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let result = evaluator_for(&server, Direction::EnKo)
            .evaluate("John Smith")
            .await
            .unwrap();

        assert_eq!(result.notation, "존 스미스");
        assert_eq!(result.overall_score, 92);
        assert!(result.compliant);
        assert_eq!(
            result.verification_process,
            vec!["Checked CF Teamwork", "Checked NIKL loanword rules"]
        );
        assert_eq!(result.recommendations, vec!["Confirm with Hazel"]);
        assert_eq!(result.verification_sources, vec!["NIKL", "IMDb"]);
        assert!(result.notes.unwrap().contains("schema mode down"));
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(2)
            .mount(&server)
            .await;

        let err = evaluator_for(&server, Direction::KoEn)
            .evaluate("김지원")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Plain-text evaluation failed for '김지원'"));
    }

    // ==================== Extractor Seam ====================

    struct FixedExtractor;

    impl ResponseExtractor for FixedExtractor {
        fn extract(&self, _raw: &str) -> PartialEvaluation {
            PartialEvaluation {
                notation: Some("fixed".to_string()),
                overall_score: Some(99),
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn test_custom_extractor_is_used_on_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("free text")))
            .mount(&server)
            .await;

        let result = evaluator_for(&server, Direction::EnKo)
            .with_extractor(Arc::new(FixedExtractor))
            .evaluate("John Smith")
            .await
            .unwrap();

        assert_eq!(result.notation, "fixed");
        assert_eq!(result.overall_score, 99);
        assert!(result.compliant);
    }
}
