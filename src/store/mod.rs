// src/store/mod.rs

//! Persistence seam for the feedback pipeline.
//!
//! Every get-or-create is idempotent on the natural keys: student/teacher
//! email, subject code, questionnaire external id, (questionnaire, question)
//! for items and (item, submitted value) for answers. Answers are shared by
//! every student who submitted the same value, which is what makes cached
//! feedback reusable across students.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerValue},
        chat_settings::{ChatSettings, CreateChatSettingsRequest},
        item::Item,
        person::{Student, Teacher},
        questionnaire::{Questionnaire, Subject},
        result::QuizResult,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Fields used when a questionnaire has to be created.
#[derive(Debug, Clone, Copy)]
pub struct NewQuestionnaire<'a> {
    pub external_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub subject_id: Uuid,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn get_or_create_student(&self, email: &str) -> Result<Student, AppError>;
    async fn get_or_create_teacher(&self, email: &str) -> Result<Teacher, AppError>;

    async fn create_chat_settings(
        &self,
        req: &CreateChatSettingsRequest,
    ) -> Result<ChatSettings, AppError>;
    async fn get_chat_settings(&self, id: Uuid) -> Result<Option<ChatSettings>, AppError>;
    async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>, AppError>;

    /// `name` and `chat_settings_id` only apply when the subject is created.
    async fn get_or_create_subject(
        &self,
        code: &str,
        name: Option<&str>,
        chat_settings_id: Uuid,
    ) -> Result<Subject, AppError>;
    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, AppError>;
    async fn add_subject_members(
        &self,
        subject_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<(), AppError>;
    async fn subject_teacher_emails(&self, subject_id: Uuid) -> Result<Vec<String>, AppError>;

    /// Title, content and subject only apply when the questionnaire is created.
    async fn get_or_create_questionnaire(
        &self,
        new: NewQuestionnaire<'_>,
    ) -> Result<Questionnaire, AppError>;
    async fn find_questionnaire(&self, external_id: &str)
    -> Result<Option<Questionnaire>, AppError>;
    async fn add_questionnaire_student(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), AppError>;
    async fn questionnaire_students(&self, questionnaire_id: Uuid)
    -> Result<Vec<Student>, AppError>;
    async fn questionnaire_items(&self, questionnaire_id: Uuid) -> Result<Vec<Item>, AppError>;

    /// `subcontent` and `correct_answer` only apply when the item is created.
    async fn get_or_create_item(
        &self,
        questionnaire_id: Uuid,
        question: &str,
        subcontent: &str,
        correct_answer: &AnswerValue,
    ) -> Result<Item, AppError>;
    async fn get_or_create_answer(
        &self,
        item_id: Uuid,
        text: &AnswerValue,
    ) -> Result<Answer, AppError>;
    /// Links (or re-links) a student to an answer, marking it as their latest for the item.
    async fn add_answer_student(&self, answer_id: Uuid, student_id: Uuid) -> Result<(), AppError>;

    /// The latest answer per item for one student, in item order.
    async fn student_answers(
        &self,
        questionnaire_id: Uuid,
        student_email: &str,
    ) -> Result<Vec<(Item, Answer)>, AppError>;

    async fn update_answer_score(&self, answer_id: Uuid, score: f64) -> Result<(), AppError>;
    async fn update_answer_feedback(
        &self,
        answer_id: Uuid,
        explanation: &str,
        suggestions: &str,
    ) -> Result<(), AppError>;

    async fn insert_result(&self, result: &QuizResult) -> Result<(), AppError>;
    async fn latest_result(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QuizResult>, AppError>;
}
