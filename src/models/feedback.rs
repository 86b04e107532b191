// src/models/feedback.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::AnswerValue;

/// Whether one submitted choice was in the correct set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOutcome {
    pub value: String,
    pub correct: bool,
}

/// Grading and feedback bundle for one answer, computed per grading pass.
/// This is what the mail collaborator renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub answer_id: Uuid,
    pub question: String,
    pub subcontent: String,
    pub answer: AnswerValue,
    pub correct_answer: AnswerValue,
    pub correct: bool,
    pub choices: Vec<ChoiceOutcome>,
    pub wrong_answers: Vec<String>,
    pub score: f64,
    pub explanation: Option<String>,
    pub suggestions: Option<String>,
}

/// One questionnaire item as submitted by the LMS.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ItemSubmission {
    #[validate(length(min = 1, max = 1024))]
    pub question: String,
    pub answer: AnswerValue,
    #[validate(length(min = 1, max = 1024))]
    pub subcontent: String,
    #[validate(custom(function = validate_correct_answer))]
    pub correct_answer: AnswerValue,
}

/// DTO for submitting a filled questionnaire.
#[derive(Debug, Deserialize, Validate)]
pub struct SendFeedbackRequest {
    #[validate(length(min = 1, max = 255))]
    pub questionnaire_title: String,
    #[validate(length(min = 1, max = 1024))]
    pub questionnaire_content: String,
    #[validate(length(min = 1, max = 255))]
    pub questionnaire_external_id: String,
    #[validate(email)]
    pub student_email: String,
    #[validate(length(min = 1, max = 255))]
    pub subject_code: String,
    #[validate(length(max = 255))]
    pub subject_name: Option<String>,
    #[validate(email)]
    pub teacher_email: String,
    /// Id of the chat settings used for this subject.
    pub chat_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required."), nested)]
    pub items: Vec<ItemSubmission>,
}

/// Named recipient groups for a resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientGroup {
    Teachers,
    Students,
    Both,
}

/// Either a named group or an explicit list of addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackRecipient {
    Group(RecipientGroup),
    Addresses(Vec<String>),
}

impl FeedbackRecipient {
    pub fn includes_teachers(&self) -> bool {
        matches!(
            self,
            FeedbackRecipient::Group(RecipientGroup::Teachers | RecipientGroup::Both)
        )
    }

    pub fn includes_students(&self) -> bool {
        matches!(
            self,
            FeedbackRecipient::Group(RecipientGroup::Students | RecipientGroup::Both)
        )
    }

    pub fn extra_addresses(&self) -> &[String] {
        match self {
            FeedbackRecipient::Addresses(list) => list,
            FeedbackRecipient::Group(_) => &[],
        }
    }
}

/// DTO for regenerating and resending feedback.
#[derive(Debug, Deserialize, Validate)]
pub struct ResendFeedbackRequest {
    #[validate(length(min = 1), custom(function = validate_emails))]
    pub student_emails: Vec<String>,
    #[validate(length(min = 1, max = 255))]
    pub questionnaire_external_id: String,
    #[validate(custom(function = validate_recipient))]
    pub feedback_recipient: FeedbackRecipient,
}

/// DTO for requesting a questionnaire report.
#[derive(Debug, Deserialize, Validate)]
pub struct SendReportRequest {
    #[validate(length(min = 1, max = 255))]
    pub questionnaire_external_id: String,
}

/// Every choice of the key counts towards the partial-credit divisor, so
/// none of them may be blank.
fn validate_correct_answer(value: &AnswerValue) -> Result<(), validator::ValidationError> {
    if value.choices().is_empty() {
        return Err(validator::ValidationError::new("correct_answer_cannot_be_empty"));
    }
    if value.choices().iter().any(|c| c.trim().is_empty()) {
        return Err(validator::ValidationError::new("correct_answer_has_blank_choice"));
    }
    Ok(())
}

fn validate_recipient(recipient: &FeedbackRecipient) -> Result<(), validator::ValidationError> {
    match recipient {
        FeedbackRecipient::Group(_) => Ok(()),
        FeedbackRecipient::Addresses(list) if list.is_empty() => Err(
            validator::ValidationError::new("feedback_recipient_cannot_be_empty"),
        ),
        FeedbackRecipient::Addresses(list) => validate_emails(list),
    }
}

fn validate_emails(emails: &[String]) -> Result<(), validator::ValidationError> {
    use validator::ValidateEmail;

    for email in emails {
        if email.len() > 1024 || !email.validate_email() {
            return Err(validator::ValidationError::new("invalid_email"));
        }
    }
    Ok(())
}
