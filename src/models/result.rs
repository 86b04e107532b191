// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'results' table in the database.
///
/// Append-only: every submission adds a row and the most recent one per
/// (student, questionnaire) is authoritative.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub questionnaire_id: Uuid,
    /// Percentage in [0, 100].
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
