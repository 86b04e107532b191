// src/models/person.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'students' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: Option<String>,
    /// Unique email, the identity used by the LMS.
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'teachers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Teacher {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
