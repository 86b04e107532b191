// src/models/chat_settings.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Which configured model handles a prompt.
/// Single-answer prompts go to the principal model, multi-answer ones to the special model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Principal,
    Special,
}

/// Represents the 'chat_settings' table in the database.
/// Per-subject LLM configuration, passed explicitly into the feedback generator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatSettings {
    pub id: Uuid,

    /// Never serialized back to clients.
    #[serde(skip_serializing)]
    pub openai_api_key: String,

    pub principal_model: String,
    pub special_model: String,

    /// System message sent with every completion.
    pub system_content_instructions: String,

    /// Token budget per completion; prompts ask for a little less.
    pub max_tokens: i32,

    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ChatSettings {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Principal => &self.principal_model,
            ModelTier::Special => &self.special_model,
        }
    }
}

/// DTO for creating chat settings.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatSettingsRequest {
    #[validate(length(min = 1, max = 255))]
    pub openai_api_key: String,
    #[validate(length(min = 1, max = 255))]
    pub principal_model: String,
    #[validate(length(min = 1, max = 255))]
    pub special_model: String,
    #[validate(length(min = 1, max = 10000))]
    pub system_content_instructions: String,
    #[validate(range(min = 1, max = 128000))]
    pub max_tokens: i32,
    #[validate(range(min = 0.0, max = 2.0, message = "Temperature must be between 0.00 and 2.00."))]
    pub temperature: f64,
    #[validate(range(min = 0.0, max = 1.0, message = "Top P must be between 0.00 and 1.00."))]
    pub top_p: f64,
    #[validate(range(
        min = 0.0,
        max = 2.0,
        message = "Frequency penalty must be between 0.00 and 2.00."
    ))]
    pub frequency_penalty: f64,
    #[validate(range(
        min = 0.0,
        max = 2.0,
        message = "Presence penalty must be between 0.00 and 2.00."
    ))]
    pub presence_penalty: f64,
}
