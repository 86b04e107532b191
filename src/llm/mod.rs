// src/llm/mod.rs

//! Chat-completion seam used by the feedback generator.

pub mod openai;

use std::{fmt, time::Duration};

use async_trait::async_trait;

pub use openai::OpenAiClient;

/// One chat-completion call. Built per answer from the subject's chat settings.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub api_key: String,
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport failure (connect, timeout, body decode).
    Http(String),
    /// Non-2xx answer from the API.
    Status { status: u16, message: String },
    /// The API answered without any text.
    EmptyResponse,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Http(msg) => write!(f, "LLM request failed: {}", msg),
            LlmError::Status { status, message } => {
                write!(f, "LLM HTTP {}: {}", status, message)
            }
            LlmError::EmptyResponse => write!(f, "LLM returned an empty completion"),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the generated text of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Bounded attempts with exponential backoff between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Runs the completion until it succeeds or the attempts run out.
    /// Client errors (4xx other than 429) are not retried.
    pub async fn complete(
        &self,
        client: &dyn ChatClient,
        request: &ChatRequest,
    ) -> Result<String, LlmError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match client.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        ?delay,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

fn is_retryable(err: &LlmError) -> bool {
    match err {
        LlmError::Status { status, .. } => *status == 429 || *status >= 500,
        LlmError::Http(_) | LlmError::EmptyResponse => true,
    }
}
