// src/models/answer.rs

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

/// A submitted or expected answer.
///
/// Clients send either a plain string or an array of strings. Some LMS
/// integrations send the array JSON-encoded inside a string
/// (`"[\"A\",\"B\"]"`); that form is decoded into `Multiple` on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    /// Builds a value from raw text, decoding a JSON-encoded list of strings.
    pub fn from_text(text: String) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if let Ok(choices) = serde_json::from_str::<Vec<String>>(trimmed) {
                return AnswerValue::Multiple(choices);
            }
        }
        AnswerValue::Single(text)
    }

    /// Ordered view over the choices, regardless of shape.
    pub fn choices(&self) -> &[String] {
        match self {
            AnswerValue::Single(value) => std::slice::from_ref(value),
            AnswerValue::Multiple(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.choices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices().iter().all(|c| c.trim().is_empty())
    }
}

impl<'de> Deserialize<'de> for AnswerValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Single(String),
            Multiple(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Single(text) => AnswerValue::from_text(text),
            Raw::Multiple(values) => AnswerValue::Multiple(values),
        })
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Single(value) => write!(f, "{}", value),
            AnswerValue::Multiple(values) => write!(f, "{}", values.join(", ")),
        }
    }
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub item_id: Uuid,

    /// Submitted value(s), stored as JSONB.
    pub text: Json<AnswerValue>,

    /// Cached LLM explanation of the mistake.
    pub feedback_explanation: Option<String>,

    /// Cached LLM study suggestions.
    pub feedback_improve_suggestions: Option<String>,

    /// Fractional credit in [0, 1].
    pub score: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_string_is_single() {
        let value: AnswerValue = serde_json::from_str(r#""Paris""#).unwrap();
        assert_eq!(value, AnswerValue::Single("Paris".to_string()));
        assert_eq!(value.len(), 1);
    }

    #[test]
    fn test_array_is_multiple() {
        let value: AnswerValue = serde_json::from_str(r#"["A", "B"]"#).unwrap();
        assert_eq!(
            value,
            AnswerValue::Multiple(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_encoded_list_string_is_decoded() {
        let value: AnswerValue = serde_json::from_str(r#""[\"A\",\"C\"]""#).unwrap();
        assert_eq!(
            value,
            AnswerValue::Multiple(vec!["A".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_bracketed_prose_stays_single() {
        let value = AnswerValue::from_text("[not json".to_string());
        assert_eq!(value, AnswerValue::Single("[not json".to_string()));
        let value = AnswerValue::from_text("[1, 2]".to_string());
        assert!(matches!(value, AnswerValue::Single(_)));
    }

    #[test]
    fn test_number_is_rejected() {
        assert!(serde_json::from_str::<AnswerValue>("42").is_err());
    }

    #[test]
    fn test_display_joins_choices() {
        let value = AnswerValue::Multiple(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(value.to_string(), "A, B");
        assert_eq!(AnswerValue::Single("x".to_string()).to_string(), "x");
    }
}
