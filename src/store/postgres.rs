// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
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

const CHAT_SETTINGS_COLUMNS: &str = "id, openai_api_key, principal_model, special_model, \
     system_content_instructions, max_tokens, temperature, top_p, frequency_penalty, \
     presence_penalty, created_at";

const ANSWER_COLUMNS: &str = "a.id, a.item_id, a.text, a.feedback_explanation, \
     a.feedback_improve_suggestions, a.score, a.created_at";

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn get_or_create_student(&self, email: &str) -> Result<Student, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (email)
            VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(student)
    }

    async fn get_or_create_teacher(&self, email: &str) -> Result<Teacher, AppError> {
        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            INSERT INTO teachers (email)
            VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(teacher)
    }

    async fn create_chat_settings(
        &self,
        req: &CreateChatSettingsRequest,
    ) -> Result<ChatSettings, AppError> {
        let sql = format!(
            r#"
            INSERT INTO chat_settings (
                openai_api_key, principal_model, special_model, system_content_instructions,
                max_tokens, temperature, top_p, frequency_penalty, presence_penalty
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CHAT_SETTINGS_COLUMNS}
            "#
        );

        let settings = sqlx::query_as::<_, ChatSettings>(&sql)
            .bind(&req.openai_api_key)
            .bind(&req.principal_model)
            .bind(&req.special_model)
            .bind(&req.system_content_instructions)
            .bind(req.max_tokens)
            .bind(req.temperature)
            .bind(req.top_p)
            .bind(req.frequency_penalty)
            .bind(req.presence_penalty)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create chat settings: {:?}", e);
                AppError::from(e)
            })?;

        Ok(settings)
    }

    async fn get_chat_settings(&self, id: Uuid) -> Result<Option<ChatSettings>, AppError> {
        let sql = format!("SELECT {CHAT_SETTINGS_COLUMNS} FROM chat_settings WHERE id = $1");
        let settings = sqlx::query_as::<_, ChatSettings>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings)
    }

    async fn list_chat_settings(&self) -> Result<Vec<ChatSettings>, AppError> {
        let sql = format!(
            "SELECT {CHAT_SETTINGS_COLUMNS} FROM chat_settings ORDER BY created_at DESC"
        );
        let settings = sqlx::query_as::<_, ChatSettings>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(settings)
    }

    async fn get_or_create_subject(
        &self,
        code: &str,
        name: Option<&str>,
        chat_settings_id: Uuid,
    ) -> Result<Subject, AppError> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (code, name, chat_settings_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
            RETURNING id, name, code, chat_settings_id, created_at
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(chat_settings_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>, AppError> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, code, chat_settings_id, created_at FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn add_subject_members(
        &self,
        subject_id: Uuid,
        student_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO subject_students (subject_id, student_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(subject_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(subject_id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn subject_teacher_emails(&self, subject_id: Uuid) -> Result<Vec<String>, AppError> {
        let emails: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT t.email
            FROM subject_teachers st
            JOIN teachers t ON t.id = st.teacher_id
            WHERE st.subject_id = $1
            ORDER BY t.email
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(emails.into_iter().map(|(email,)| email).collect())
    }

    async fn get_or_create_questionnaire(
        &self,
        new: NewQuestionnaire<'_>,
    ) -> Result<Questionnaire, AppError> {
        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            INSERT INTO questionnaires (external_id, title, content, subject_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id, title, content, external_id, subject_id, created_at
            "#,
        )
        .bind(new.external_id)
        .bind(new.title)
        .bind(new.content)
        .bind(new.subject_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(questionnaire)
    }

    async fn find_questionnaire(
        &self,
        external_id: &str,
    ) -> Result<Option<Questionnaire>, AppError> {
        let questionnaire = sqlx::query_as::<_, Questionnaire>(
            r#"
            SELECT id, title, content, external_id, subject_id, created_at
            FROM questionnaires
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(questionnaire)
    }

    async fn add_questionnaire_student(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO questionnaire_students (questionnaire_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(questionnaire_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn questionnaire_students(
        &self,
        questionnaire_id: Uuid,
    ) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT s.id, s.name, s.email, s.created_at
            FROM questionnaire_students qs
            JOIN students s ON s.id = qs.student_id
            WHERE qs.questionnaire_id = $1
            ORDER BY s.email
            "#,
        )
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn questionnaire_items(&self, questionnaire_id: Uuid) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, questionnaire_id, question, subcontent, correct_answer, created_at
            FROM items
            WHERE questionnaire_id = $1
            ORDER BY created_at, question
            "#,
        )
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_or_create_item(
        &self,
        questionnaire_id: Uuid,
        question: &str,
        subcontent: &str,
        correct_answer: &AnswerValue,
    ) -> Result<Item, AppError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (questionnaire_id, question, subcontent, correct_answer)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (questionnaire_id, question) DO UPDATE SET question = EXCLUDED.question
            RETURNING id, questionnaire_id, question, subcontent, correct_answer, created_at
            "#,
        )
        .bind(questionnaire_id)
        .bind(question)
        .bind(subcontent)
        .bind(Json(correct_answer.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    async fn get_or_create_answer(
        &self,
        item_id: Uuid,
        text: &AnswerValue,
    ) -> Result<Answer, AppError> {
        let answer = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (item_id, text)
            VALUES ($1, $2)
            ON CONFLICT (item_id, text) DO UPDATE SET text = EXCLUDED.text
            RETURNING id, item_id, text, feedback_explanation, feedback_improve_suggestions,
                      score, created_at
            "#,
        )
        .bind(item_id)
        .bind(Json(text.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(answer)
    }

    async fn add_answer_student(&self, answer_id: Uuid, student_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO answer_students (answer_id, student_id)
            VALUES ($1, $2)
            ON CONFLICT (answer_id, student_id) DO UPDATE SET linked_at = NOW()
            "#,
        )
        .bind(answer_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn student_answers(
        &self,
        questionnaire_id: Uuid,
        student_email: &str,
    ) -> Result<Vec<(Item, Answer)>, AppError> {
        let items = self.questionnaire_items(questionnaire_id).await?;

        let sql = format!(
            r#"
            SELECT {ANSWER_COLUMNS}
            FROM answers a
            JOIN items i ON i.id = a.item_id
            JOIN answer_students ans ON ans.answer_id = a.id
            JOIN students s ON s.id = ans.student_id
            WHERE i.questionnaire_id = $1 AND s.email = $2
            ORDER BY ans.linked_at DESC
            "#
        );
        let answers = sqlx::query_as::<_, Answer>(&sql)
            .bind(questionnaire_id)
            .bind(student_email)
            .fetch_all(&self.pool)
            .await?;

        // Rows are newest first, so the first answer seen per item wins.
        let mut latest: HashMap<Uuid, Answer> = HashMap::new();
        for answer in answers {
            latest.entry(answer.item_id).or_insert(answer);
        }

        Ok(items
            .into_iter()
            .filter_map(|item| latest.remove(&item.id).map(|answer| (item, answer)))
            .collect())
    }

    async fn update_answer_score(&self, answer_id: Uuid, score: f64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE answers SET score = $1 WHERE id = $2")
            .bind(score)
            .bind(answer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Answer {} not found", answer_id)));
        }
        Ok(())
    }

    async fn update_answer_feedback(
        &self,
        answer_id: Uuid,
        explanation: &str,
        suggestions: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE answers
            SET feedback_explanation = $1, feedback_improve_suggestions = $2
            WHERE id = $3
            "#,
        )
        .bind(explanation)
        .bind(suggestions)
        .bind(answer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Answer {} not found", answer_id)));
        }
        Ok(())
    }

    async fn insert_result(&self, result: &QuizResult) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO results (id, student_id, questionnaire_id, score, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(result.id)
        .bind(result.student_id)
        .bind(result.questionnaire_id)
        .bind(result.score)
        .bind(result.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert result: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn latest_result(
        &self,
        questionnaire_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QuizResult>, AppError> {
        let result = sqlx::query_as::<_, QuizResult>(
            r#"
            SELECT id, student_id, questionnaire_id, score, created_at
            FROM results
            WHERE questionnaire_id = $1 AND student_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(questionnaire_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }
}
