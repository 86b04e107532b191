// src/handlers/report.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    mailer::ReportEmail,
    models::feedback::SendReportRequest,
    services::{jobs, report},
    state::AppState,
    utils::json::AppJson,
};

/// Builds the questionnaire report and mails it to the subject's teachers.
pub async fn send_report(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let store = state.store.as_ref();

    let questionnaire = store
        .find_questionnaire(&payload.questionnaire_external_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Questionnaire '{}' not found",
                payload.questionnaire_external_id
            ))
        })?;

    let report = report::build_report(store, &questionnaire).await?;
    let teachers = store.subject_teacher_emails(questionnaire.subject_id).await?;
    if teachers.is_empty() {
        tracing::warn!(questionnaire = %questionnaire.external_id, "Subject has no teachers to receive the report");
    }

    let students = report.rows.len();
    let recipients = teachers.len();
    jobs::spawn_report_job(&state, ReportEmail::new(teachers, report));

    Ok(Json(json!({
        "message": "Report scheduled.",
        "students": students,
        "recipients": recipients,
    })))
}
