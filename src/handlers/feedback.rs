// src/handlers/feedback.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        chat_settings::ChatSettings,
        feedback::{FeedbackRecipient, ResendFeedbackRequest, SendFeedbackRequest},
        questionnaire::Subject,
    },
    services::{
        aggregator, grader,
        jobs::{self, FeedbackJob},
    },
    state::AppState,
    store::{FeedbackStore, NewQuestionnaire},
    utils::json::AppJson,
};

/// Chat settings in effect for a subject. The subject keeps the settings it
/// was created with, later submissions cannot switch them.
async fn subject_settings(
    store: &dyn FeedbackStore,
    subject: &Subject,
) -> Result<ChatSettings, AppError> {
    store
        .get_chat_settings(subject.chat_settings_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Chat settings {} not found",
                subject.chat_settings_id
            ))
        })
}

/// Receives a filled questionnaire from the LMS.
///
/// Stores everything, grades synchronously and records the result. Feedback
/// generation and the email run in the background.
pub async fn send_feedback(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let store = state.store.as_ref();

    let student = store.get_or_create_student(&payload.student_email).await?;
    let teacher = store.get_or_create_teacher(&payload.teacher_email).await?;

    let requested = store
        .get_chat_settings(payload.chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat settings {} not found", payload.chat_id)))?;

    let subject = store
        .get_or_create_subject(
            &payload.subject_code,
            payload.subject_name.as_deref(),
            requested.id,
        )
        .await?;
    store
        .add_subject_members(subject.id, student.id, teacher.id)
        .await?;
    let settings = if subject.chat_settings_id == requested.id {
        requested
    } else {
        subject_settings(store, &subject).await?
    };

    let questionnaire = store
        .get_or_create_questionnaire(NewQuestionnaire {
            external_id: &payload.questionnaire_external_id,
            title: &payload.questionnaire_title,
            content: &payload.questionnaire_content,
            subject_id: subject.id,
        })
        .await?;
    store
        .add_questionnaire_student(questionnaire.id, student.id)
        .await?;

    let mut pairs = Vec::with_capacity(payload.items.len());
    for submitted in &payload.items {
        let item = store
            .get_or_create_item(
                questionnaire.id,
                &submitted.question,
                &submitted.subcontent,
                &submitted.correct_answer,
            )
            .await?;
        let answer = store.get_or_create_answer(item.id, &submitted.answer).await?;
        store.add_answer_student(answer.id, student.id).await?;
        pairs.push((item, answer));
    }

    let batch = grader::grade_all(store, &pairs).await?;
    let result =
        aggregator::record_result(store, student.id, questionnaire.id, &batch.records).await?;

    tracing::info!(
        student = %student.email,
        questionnaire = %questionnaire.external_id,
        score = result.score,
        correct = batch.correct_count,
        total = batch.records.len(),
        "Submission graded"
    );

    jobs::spawn_feedback_job(
        &state,
        FeedbackJob {
            settings,
            records: batch.records,
            correct_count: batch.correct_count,
            questionnaire_title: questionnaire.title,
            questionnaire_content: questionnaire.content,
            recipients: vec![student.email.clone()],
            student_email: student.email,
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Answers graded. Feedback will be sent by email.",
            "result_id": result.id,
            "score": result.score,
        })),
    ))
}

/// Who receives a resent batch for one student, without duplicates.
pub fn resend_recipients(
    recipient: &FeedbackRecipient,
    teacher_emails: &[String],
    student_email: &str,
) -> Vec<String> {
    let mut recipients: Vec<String> = Vec::new();
    let mut push = |email: &str| {
        if !recipients.iter().any(|r| r.eq_ignore_ascii_case(email)) {
            recipients.push(email.to_string());
        }
    };

    if recipient.includes_teachers() {
        teacher_emails.iter().for_each(|e| push(e));
    }
    recipient.extra_addresses().iter().for_each(|e| push(e));
    if recipient.includes_students() {
        push(student_email);
    }
    recipients
}

/// Regrades stored answers and sends the feedback again.
pub async fn resend_feedback(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResendFeedbackRequest>,
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
    let subject = store
        .get_subject(questionnaire.subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subject {} not found", questionnaire.subject_id)))?;
    let settings = subject_settings(store, &subject).await?;

    let teacher_emails = if payload.feedback_recipient.includes_teachers() {
        store.subject_teacher_emails(subject.id).await?
    } else {
        Vec::new()
    };

    let mut dispatched = Vec::new();
    let mut without_answers = Vec::new();
    let mut without_recipients = Vec::new();
    for email in &payload.student_emails {
        let pairs = store.student_answers(questionnaire.id, email).await?;
        if pairs.is_empty() {
            tracing::warn!(student = %email, "No stored answers, skipping resend");
            without_answers.push(email.clone());
            continue;
        }

        let recipients = resend_recipients(&payload.feedback_recipient, &teacher_emails, email);
        if recipients.is_empty() {
            tracing::warn!(student = %email, "No recipients for resend, skipping");
            without_recipients.push(email.clone());
            continue;
        }

        let batch = grader::grade_all(store, &pairs).await?;
        jobs::spawn_feedback_job(
            &state,
            FeedbackJob {
                settings: settings.clone(),
                records: batch.records,
                correct_count: batch.correct_count,
                questionnaire_title: questionnaire.title.clone(),
                questionnaire_content: questionnaire.content.clone(),
                student_email: email.clone(),
                recipients,
            },
        );
        dispatched.push(email.clone());
    }

    Ok(Json(json!({
        "message": "Feedback regeneration scheduled.",
        "dispatched": dispatched,
        "without_answers": without_answers,
        "without_recipients": without_recipients,
    })))
}
