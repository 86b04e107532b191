// src/llm/openai.rs

//! OpenAI-compatible chat.completions client.
//!
//! Logs model names, latencies and token usage. Never logs the api key or
//! the prompt body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use crate::llm::{ChatClient, ChatRequest, LlmError};

#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessageReq<'a>; 2],
    temperature: f64,
    max_tokens: i32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Serialize)]
struct ChatMessageReq<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    #[instrument(level = "info", skip(self, request), fields(model = %request.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: [
                ChatMessageReq {
                    role: "system",
                    content: &request.system,
                },
                ChatMessageReq {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        };

        let start = Instant::now();
        let res = self
            .client
            .post(self.completions_url())
            .header(USER_AGENT, concat!("feedfor/", env!("CARGO_PKG_VERSION")))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", request.api_key))
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = extract_openai_error(&body).unwrap_or(body);
            return Err(LlmError::Status { status, message });
        }

        let body: ChatCompletionResponse = res.json().await?;
        let elapsed = start.elapsed();
        if let Some(usage) = &body.usage {
            info!(
                ?elapsed,
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "OpenAI usage"
            );
        }

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Pulls `error.message` out of an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
