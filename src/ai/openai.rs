use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::CompletionClient;
use crate::config::{AiConfig, ENV_AI_KEY};
use crate::error::{LedgerError, LedgerResult};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint,
/// always asking for a JSON object reply.
pub(crate) struct OpenAiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiClient {
    pub(crate) fn from_config(config: &AiConfig) -> LedgerResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LedgerError::AiError(format!("{ENV_AI_KEY} is not set")))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> LedgerResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting completion");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LedgerError::AiError(format!(
                "API error ({}): {message}",
                status.as_u16()
            )));
        }

        let body: ChatResponse = response.json()?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
