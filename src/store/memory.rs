// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;
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
    store::{FeedbackStore, NewQuestionnaire},
};

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    chat_settings: Vec<ChatSettings>,
    subjects: Vec<Subject>,
    subject_students: Vec<(Uuid, Uuid)>,
    subject_teachers: Vec<(Uuid, Uuid)>,
    questionnaires: Vec<Questionnaire>,
    questionnaire_students: Vec<(Uuid, Uuid)>,
    items: Vec<Item>,
    answers: Vec<Answer>,
    /// (answer, student) -> link sequence; higher is newer.
    answer_students: HashMap<(Uuid, Uuid), u64>,
    link_seq: u64,
    results: Vec<QuizResult>,
}

/// In-process store with the same uniqueness rules as the Postgres schema.
/// Used by the test suite and for running without a database.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer rows as currently stored.
    pub async fn answers(&self) -> Vec<Answer> {
        self.tables.read().await.answers.clone()
    }

    /// Every result row, in insertion order.
    pub async fn results(&self) -> Vec<QuizResult> {
        self.tables.read().await.results.clone()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn get_or_create_student(&self, email: &str) -> Result<Student, AppError> {
        let mut t = self.tables.write().await;
        if let Some(student) = t.students.iter().find(|s| s.email == email) {
            return Ok(student.clone());
        }
        let student = Student {
            id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            created_at: Utc::now(),
        };
        t.students.push(student.clone());
        Ok(student)
    }

    async fn get_or_create_teacher(&self, email: &str) -> Result<Teacher, AppError> {
        let mut t = self.tables.write().await;
        if let Some(teacher) = t.teachers.iter().find(|s| s.email == email) {
            return Ok(teacher.clone());
        }
        let teacher = Teacher {
            id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            created_at: Utc::now(),
        };
        t.teachers.push(teacher.clone());
        Ok(teacher)
    }

    async fn create_chat_settings(
        &self,
        req: &CreateChatSettingsRequest,
    ) -> Result<ChatSettings, AppError> {
        let settings = ChatSettings {
            id: Uuid::new_v4(),
            openai_api_key: req.openai_api_key.clone(),
            principal_model: req.principal_model.clone(),
            special_model: req.special_model.clone(),
            system_content_instructions: req.system_content_instructions.clone(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            frequency_penalty: req.frequency_penalty,
            presence_penalty: req.presence_penalty,
            created_at: Utc::now(),
        };
        self.tables.write().await.chat_settings.push(settings.clone());
        Ok(settings)
    }

    async fn get_chat_settings(&self, id: Uuid) -> Result<Option<ChatSettings>, AppError> {
        let t = self.tables.read().await;
        Ok(t.chat_settings.iter().find(|s| s.id == id).cloned())
    }

    async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>, AppError> {
        let t = self.tables.read().await;
        Ok(t.chat_settings.iter().rev().cloned().collect())
    }

    async fn get_or_create_subject(
        &self,
        code: &str,
        name: Option<&str>,
        chat_settings_id: Uuid,
    ) -> Result<Subject, AppError> {
        let mut t = self.tables.write().await;
        if let Some(subject) = t.subjects.iter().find(|s| s.code == code) {
            return Ok(subject.clone());
        }
        if !t.chat_settings.iter().any(|s| s.id == chat_settings_id) {
            return Err(AppError::NotFound(format!(
                "Chat settings {} not found",
                chat_settings_id
            )));
        }
        let subject = Subject {
            id: Uuid::new_v4(),
            name: name.map(str::to_string),
            code: code.to_string(),
            chat_settings_id,
            created_at: Utc::now(),
        };
        t.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, AppError> {
        let t = self.tables.read().await;
        Ok(t.subjects.iter().find(|s| s.id == id).cloned())
    }

    async fn add_subject_members(
        &self,
        subject_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        if !t.subject_students.contains(&(subject_id, student_id)) {
            t.subject_students.push((subject_id, student_id));
        }
        if !t.subject_teachers.contains(&(subject_id, teacher_id)) {
            t.subject_teachers.push((subject_id, teacher_id));
        }
        Ok(())
    }

    async fn subject_teacher_emails(&self, subject_id: Uuid) -> Result<Vec<String>, AppError> {
        let t = self.tables.read().await;
        let mut emails: Vec<String> = t
            .subject_teachers
            .iter()
            .filter(|(s, _)| *s == subject_id)
            .filter_map(|(_, teacher_id)| t.teachers.iter().find(|x| x.id == *teacher_id))
            .map(|teacher| teacher.email.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }

    async fn get_or_create_questionnaire(
        &self,
        new: NewQuestionnaire<'_>,
    ) -> Result<Questionnaire, AppError> {
        let mut t = self.tables.write().await;
        if let Some(q) = t
            .questionnaires
            .iter()
            .find(|q| q.external_id == new.external_id)
        {
            return Ok(q.clone());
        }
        let questionnaire = Questionnaire {
            id: Uuid::new_v4(),
            title: new.title.to_string(),
            content: new.content.to_string(),
            external_id: new.external_id.to_string(),
            subject_id: new.subject_id,
            created_at: Utc::now(),
        };
        t.questionnaires.push(questionnaire.clone());
        Ok(questionnaire)
    }

    async fn find_questionnaire(
        &self,
        external_id: &str,
    ) -> Result<Option<Questionnaire>, AppError> {
        let t = self.tables.read().await;
        Ok(t
            .questionnaires
            .iter()
            .find(|q| q.external_id == external_id)
            .cloned())
    }

    async fn add_questionnaire_student(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        if !t
            .questionnaire_students
            .contains(&(questionnaire_id, student_id))
        {
            t.questionnaire_students.push((questionnaire_id, student_id));
        }
        Ok(())
    }

    async fn questionnaire_students(
        &self,
        questionnaire_id: Uuid,
    ) -> Result<Vec<Student>, AppError> {
        let t = self.tables.read().await;
        let mut students: Vec<Student> = t
            .questionnaire_students
            .iter()
            .filter(|(q, _)| *q == questionnaire_id)
            .filter_map(|(_, student_id)| t.students.iter().find(|s| s.id == *student_id))
            .cloned()
            .collect();
        students.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(students)
    }

    async fn questionnaire_items(&self, questionnaire_id: Uuid) -> Result<Vec<Item>, AppError> {
        let t = self.tables.read().await;
        Ok(t
            .items
            .iter()
            .filter(|i| i.questionnaire_id == questionnaire_id)
            .cloned()
            .collect())
    }

    async fn get_or_create_item(
        &self,
        questionnaire_id: Uuid,
        question: &str,
        subcontent: &str,
        correct_answer: &AnswerValue,
    ) -> Result<Item, AppError> {
        let mut t = self.tables.write().await;
        if let Some(item) = t
            .items
            .iter()
            .find(|i| i.questionnaire_id == questionnaire_id && i.question == question)
        {
            return Ok(item.clone());
        }
        let item = Item {
            id: Uuid::new_v4(),
            questionnaire_id,
            question: question.to_string(),
            subcontent: subcontent.to_string(),
            correct_answer: Json(correct_answer.clone()),
            created_at: Utc::now(),
        };
        t.items.push(item.clone());
        Ok(item)
    }

    async fn get_or_create_answer(
        &self,
        item_id: Uuid,
        text: &AnswerValue,
    ) -> Result<Answer, AppError> {
        let mut t = self.tables.write().await;
        if let Some(answer) = t
            .answers
            .iter()
            .find(|a| a.item_id == item_id && a.text.0 == *text)
        {
            return Ok(answer.clone());
        }
        let answer = Answer {
            id: Uuid::new_v4(),
            item_id,
            text: Json(text.clone()),
            feedback_explanation: None,
            feedback_improve_suggestions: None,
            score: 0.0,
            created_at: Utc::now(),
        };
        t.answers.push(answer.clone());
        Ok(answer)
    }

    async fn add_answer_student(&self, answer_id: Uuid, student_id: Uuid) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.link_seq += 1;
        let seq = t.link_seq;
        t.answer_students.insert((answer_id, student_id), seq);
        Ok(())
    }

    async fn student_answers(
        &self,
        questionnaire_id: Uuid,
        student_email: &str,
    ) -> Result<Vec<(Item, Answer)>, AppError> {
        let t = self.tables.read().await;
        let Some(student) = t.students.iter().find(|s| s.email == student_email) else {
            return Ok(Vec::new());
        };

        let mut pairs = Vec::new();
        for item in t.items.iter().filter(|i| i.questionnaire_id == questionnaire_id) {
            let latest = t
                .answers
                .iter()
                .filter(|a| a.item_id == item.id)
                .filter_map(|a| {
                    t.answer_students
                        .get(&(a.id, student.id))
                        .map(|seq| (*seq, a))
                })
                .max_by_key(|(seq, _)| *seq);

            if let Some((_, answer)) = latest {
                pairs.push((item.clone(), answer.clone()));
            }
        }
        Ok(pairs)
    }

    async fn update_answer_score(&self, answer_id: Uuid, score: f64) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let answer = t
            .answers
            .iter_mut()
            .find(|a| a.id == answer_id)
            .ok_or_else(|| AppError::NotFound(format!("Answer {} not found", answer_id)))?;
        answer.score = score;
        Ok(())
    }

    async fn update_answer_feedback(
        &self,
        answer_id: Uuid,
        explanation: &str,
        suggestions: &str,
    ) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let answer = t
            .answers
            .iter_mut()
            .find(|a| a.id == answer_id)
            .ok_or_else(|| AppError::NotFound(format!("Answer {} not found", answer_id)))?;
        answer.feedback_explanation = Some(explanation.to_string());
        answer.feedback_improve_suggestions = Some(suggestions.to_string());
        Ok(())
    }

    async fn insert_result(&self, result: &QuizResult) -> Result<(), AppError> {
        self.tables.write().await.results.push(result.clone());
        Ok(())
    }

    async fn latest_result(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QuizResult>, AppError> {
        let t = self.tables.read().await;
        // Later inserts win ties on created_at.
        Ok(t
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.questionnaire_id == questionnaire_id && r.student_id == student_id)
            .max_by_key(|(idx, r)| (r.created_at, *idx))
            .map(|(_, r)| r.clone()))
    }
}
