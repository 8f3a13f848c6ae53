use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Thin chat-completions client. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatClient {
    pub fn from_config(http: reqwest::Client, config: &Config) -> Result<Self> {
        Ok(Self {
            http,
            api_url: config.openai_api_url.clone(),
            api_key: config.require_openai_key()?.to_string(),
            model: config.openai_model.clone(),
            temperature: config.openai_temperature,
            max_tokens: config.openai_max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask for a single JSON object. Returns the raw message content.
    pub async fn complete_json(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, true).await
    }

    pub async fn complete_text(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, false).await
    }

    fn build_request(&self, prompt: &str, json_mode: bool) -> ChatRequest {
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_completion_tokens: self.max_tokens,
            // Reasoning models reject temperature
            temperature: if is_reasoning {
                None
            } else {
                Some(self.temperature)
            },
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String> {
        let request = self.build_request(prompt, json_mode);
        debug!(model = %self.model, json_mode, "Sending chat completion request");

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("OpenAI API error ({}): {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("OpenAI response contained no choices")?;

        Ok(content)
    }
}
