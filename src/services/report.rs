// src/services/report.rs

//! Per-questionnaire report: one row per student and per-question statistics.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    error::FeedbackError,
    models::{item::Item, questionnaire::Questionnaire},
    store::FeedbackStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Correct,
    Partial,
    Incorrect,
}

impl ScoreBand {
    pub fn of(score: f64) -> Self {
        if score >= 1.0 {
            ScoreBand::Correct
        } else if score > 0.0 {
            ScoreBand::Partial
        } else {
            ScoreBand::Incorrect
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRow {
    pub email: String,
    pub name: Option<String>,
    /// One score per report question, 0.0 when unanswered.
    pub item_scores: Vec<f64>,
    /// Latest result, 0.0 when the student has none.
    pub result_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStats {
    pub question: String,
    pub correct: usize,
    pub partial: usize,
    pub incorrect: usize,
    pub correct_pct: f64,
    pub partial_pct: f64,
    pub incorrect_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireReport {
    pub title: String,
    pub questions: Vec<String>,
    pub rows: Vec<StudentRow>,
    pub stats: Vec<QuestionStats>,
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Classifies every student's score for each question.
pub fn question_stats(questions: &[String], rows: &[StudentRow]) -> Vec<QuestionStats> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, question)| {
            let (mut correct, mut partial, mut incorrect) = (0, 0, 0);
            for row in rows {
                match ScoreBand::of(row.item_scores.get(idx).copied().unwrap_or(0.0)) {
                    ScoreBand::Correct => correct += 1,
                    ScoreBand::Partial => partial += 1,
                    ScoreBand::Incorrect => incorrect += 1,
                }
            }
            QuestionStats {
                question: question.clone(),
                correct,
                partial,
                incorrect,
                correct_pct: percent(correct, rows.len()),
                partial_pct: percent(partial, rows.len()),
                incorrect_pct: percent(incorrect, rows.len()),
            }
        })
        .collect()
}

pub async fn build_report(
    store: &dyn FeedbackStore,
    questionnaire: &Questionnaire,
) -> Result<QuestionnaireReport, FeedbackError> {
    let items: Vec<Item> = store.questionnaire_items(questionnaire.id).await?;
    let students = store.questionnaire_students(questionnaire.id).await?;

    let mut rows = Vec::with_capacity(students.len());
    for student in students {
        let scores: HashMap<_, _> = store
            .student_answers(questionnaire.id, &student.email)
            .await?
            .into_iter()
            .map(|(item, answer)| (item.id, answer.score))
            .collect();
        let result_score = store
            .latest_result(questionnaire.id, student.id)
            .await?
            .map(|r| r.score)
            .unwrap_or(0.0);

        rows.push(StudentRow {
            item_scores: items
                .iter()
                .map(|item| scores.get(&item.id).copied().unwrap_or(0.0))
                .collect(),
            email: student.email,
            name: student.name,
            result_score,
        });
    }

    let questions: Vec<String> = items.into_iter().map(|i| i.question).collect();
    let stats = question_stats(&questions, &rows);

    Ok(QuestionnaireReport {
        title: questionnaire.title.clone(),
        questions,
        rows,
        stats,
    })
}
