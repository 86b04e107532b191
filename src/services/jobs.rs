// src/services/jobs.rs

//! Background work spawned by the HTTP handlers.
//!
//! A feedback job generates missing feedback for one student's batch, then
//! spawns the mail job once every item has been processed. Failures are
//! logged and never reach the client.

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    mailer::{FeedbackEmail, ReportEmail},
    models::{chat_settings::ChatSettings, feedback::FeedbackRecord},
    services::generator::FeedbackGenerator,
    state::AppState,
};

/// Everything a feedback job needs about one student's submission.
#[derive(Debug, Clone)]
pub struct FeedbackJob {
    pub settings: ChatSettings,
    pub records: Vec<FeedbackRecord>,
    /// Items answered fully correctly.
    pub correct_count: usize,
    pub questionnaire_title: String,
    pub questionnaire_content: String,
    pub student_email: String,
    pub recipients: Vec<String>,
}

/// The returned handle resolves after the mail job has finished.
pub fn spawn_feedback_job(state: &AppState, job: FeedbackJob) -> JoinHandle<()> {
    let FeedbackJob {
        settings,
        mut records,
        correct_count,
        questionnaire_title,
        questionnaire_content,
        student_email,
        recipients,
    } = job;
    let generator = FeedbackGenerator::new(
        state.store.clone(),
        state.llm.clone(),
        settings,
        state.retry,
    );
    let mailer = state.mailer.clone();

    tokio::spawn(async move {
        let report = generator.run(&mut records, &questionnaire_content).await;
        info!(
            student = %student_email,
            saved = report.saved(),
            failed = report.failed(),
            "Feedback job done, dispatching mail"
        );

        let email = FeedbackEmail::new(
            recipients,
            &student_email,
            &questionnaire_title,
            correct_count,
            records,
        );
        let mail = tokio::spawn(async move {
            if let Err(e) = mailer.send_feedback(email).await {
                error!("Failed to send feedback email: {:?}", e);
            }
        });
        if let Err(e) = mail.await {
            error!("Mail job panicked: {:?}", e);
        }
    })
}

pub fn spawn_report_job(state: &AppState, email: ReportEmail) -> JoinHandle<()> {
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_report(email).await {
            error!("Failed to send report email: {:?}", e);
        }
    })
}
