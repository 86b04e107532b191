// src/services/aggregator.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::FeedbackError,
    models::{feedback::FeedbackRecord, result::QuizResult},
    store::FeedbackStore,
};

/// Average item score scaled to 0..=100.
pub fn aggregate(records: &[FeedbackRecord]) -> Result<f64, FeedbackError> {
    if records.is_empty() {
        return Err(FeedbackError::Aggregation(
            "cannot aggregate a submission without items".to_string(),
        ));
    }
    let total: f64 = records.iter().map(|r| r.score).sum();
    Ok(total * 100.0 / records.len() as f64)
}

/// Appends a new result for the student. Older results are kept.
pub async fn record_result(
    store: &dyn FeedbackStore,
    student_id: Uuid,
    questionnaire_id: Uuid,
    records: &[FeedbackRecord],
) -> Result<QuizResult, FeedbackError> {
    let result = QuizResult {
        id: Uuid::new_v4(),
        student_id,
        questionnaire_id,
        score: aggregate(records)?,
        created_at: Utc::now(),
    };
    store.insert_result(&result).await?;
    tracing::info!(
        %student_id,
        %questionnaire_id,
        score = result.score,
        "Result recorded"
    );
    Ok(result)
}
