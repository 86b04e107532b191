// src/models/questionnaire.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'subjects' table in the database.
/// A subject owns the chat settings used for all of its questionnaires.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: Option<String>,
    /// Unique subject code.
    pub code: String,
    pub chat_settings_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'questionnaires' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: Uuid,
    pub title: String,

    /// Topic of the questionnaire, fed into every prompt.
    pub content: String,

    /// Identifier assigned by the LMS. Unique.
    pub external_id: String,

    pub subject_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
