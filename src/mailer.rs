// src/mailer.rs

//! Hand-off point to the mail collaborator.
//!
//! Delivery itself happens elsewhere; this crate decides who receives what
//! and renders the feedback body.

use async_trait::async_trait;
use tracing::info;

use crate::{
    error::AppError,
    models::feedback::FeedbackRecord,
    services::report::QuestionnaireReport,
    utils::html::{clean_html, escape_text},
};

#[derive(Debug, Clone)]
pub struct FeedbackEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub student_email: String,
    pub questionnaire_title: String,
    /// Items answered fully correctly.
    pub correct_count: usize,
    pub records: Vec<FeedbackRecord>,
    pub html: String,
}

impl FeedbackEmail {
    pub fn new(
        recipients: Vec<String>,
        student_email: &str,
        questionnaire_title: &str,
        correct_count: usize,
        records: Vec<FeedbackRecord>,
    ) -> Self {
        Self {
            subject: format!("Feedback Formativo - {}", questionnaire_title),
            html: render_feedback_html(questionnaire_title, correct_count, &records),
            correct_count,
            recipients,
            student_email: student_email.to_string(),
            questionnaire_title: questionnaire_title.to_string(),
            records,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub report: QuestionnaireReport,
}

impl ReportEmail {
    pub fn new(recipients: Vec<String>, report: QuestionnaireReport) -> Self {
        Self {
            subject: format!("Relatório do Questionário {}", report.title),
            recipients,
            report,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_feedback(&self, email: FeedbackEmail) -> Result<(), AppError>;
    async fn send_report(&self, email: ReportEmail) -> Result<(), AppError>;
}

/// Renders the per-student feedback body.
/// Student input is escaped, model output is sanitized.
pub fn render_feedback_html(
    questionnaire_title: &str,
    correct_count: usize,
    records: &[FeedbackRecord],
) -> String {
    let mut html = format!("<h2>{}</h2>\n", escape_text(questionnaire_title));
    html.push_str(&format!(
        "<p>Você acertou {} de {} questões.</p>\n",
        correct_count,
        records.len()
    ));

    for (idx, record) in records.iter().enumerate() {
        html.push_str("<div class=\"item\">\n");
        html.push_str(&format!(
            "<h3>{}. {}</h3>\n",
            idx + 1,
            escape_text(&record.question)
        ));
        html.push_str(&format!(
            "<p><b>Sua resposta:</b> {}</p>\n",
            escape_text(&record.answer.to_string())
        ));

        if record.correct {
            html.push_str("<p class=\"correct\">Resposta correta!</p>\n");
        } else {
            html.push_str(&format!(
                "<p><b>Resposta correta:</b> {}</p>\n",
                escape_text(&record.correct_answer.to_string())
            ));
            if let Some(explanation) = record.explanation.as_deref().filter(|s| !s.is_empty()) {
                html.push_str(&format!(
                    "<p><b>Explicação:</b><br>{}</p>\n",
                    clean_html(explanation)
                ));
            }
            if let Some(suggestions) = record.suggestions.as_deref().filter(|s| !s.is_empty()) {
                html.push_str(&format!(
                    "<p><b>Sugestões de estudo:</b><br>{}</p>\n",
                    clean_html(suggestions)
                ));
            }
        }
        html.push_str("</div>\n");
    }
    html
}

/// Logs every delivery instead of sending it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    pub from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_feedback(&self, email: FeedbackEmail) -> Result<(), AppError> {
        info!(
            from = %self.from,
            to = ?email.recipients,
            subject = %email.subject,
            student = %email.student_email,
            items = email.records.len(),
            correct = email.correct_count,
            body_bytes = email.html.len(),
            "Feedback email handed off"
        );
        Ok(())
    }

    async fn send_report(&self, email: ReportEmail) -> Result<(), AppError> {
        info!(
            from = %self.from,
            to = ?email.recipients,
            subject = %email.subject,
            students = email.report.rows.len(),
            questions = email.report.questions.len(),
            "Report email handed off"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::AnswerValue;

    fn record(correct: bool, explanation: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            answer_id: uuid::Uuid::new_v4(),
            question: "Capital da França?".into(),
            subcontent: "Europa".into(),
            answer: AnswerValue::Single(if correct { "Paris" } else { "Lyon" }.into()),
            correct_answer: AnswerValue::Single("Paris".into()),
            correct,
            choices: Vec::new(),
            wrong_answers: Vec::new(),
            score: if correct { 1.0 } else { 0.0 },
            explanation: explanation.map(str::to_string),
            suggestions: Some("Revise\ngeografia".into()),
        }
    }

    #[test]
    fn test_render_sanitizes_model_output() {
        let html = render_feedback_html(
            "Geografia",
            0,
            &[record(false, Some("Errado.<script>steal()</script>"))],
        );
        assert!(html.contains("Você acertou 0 de 1 questões."));
        assert!(html.contains("Explicação:"));
        assert!(html.contains("Errado."));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Revise<br>geografia"));
    }

    #[test]
    fn test_render_correct_answer_has_no_feedback_sections() {
        let html = render_feedback_html("Geografia", 1, &[record(true, None)]);
        assert!(html.contains("Resposta correta!"));
        assert!(!html.contains("Sugestões de estudo:"));
    }

    #[test]
    fn test_subjects() {
        let email = FeedbackEmail::new(vec!["a@x.com".into()], "a@x.com", "Geo", 0, vec![]);
        assert_eq!(email.subject, "Feedback Formativo - Geo");
        assert_eq!(email.correct_count, 0);
    }
}
