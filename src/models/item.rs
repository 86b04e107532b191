// src/models/item.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

use crate::models::answer::AnswerValue;

/// Represents the 'items' table in the database.
/// One question of a questionnaire, unique per (questionnaire, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub questionnaire_id: Uuid,

    /// The question text as shown to the student.
    pub question: String,

    /// Topic tag inside the questionnaire content.
    pub subcontent: String,

    /// Expected value(s), stored as JSONB.
    pub correct_answer: Json<AnswerValue>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
