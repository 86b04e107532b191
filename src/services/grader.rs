// src/services/grader.rs

//! Answer grading.
//!
//! Two modes coexist, picked from the shape of both sides:
//! * exact match when the submission and the key hold one choice each
//!   (trimmed, case-insensitive);
//! * partial credit otherwise: +1 per correct choice, -1 per wrong one,
//!   divided by the number of correct choices and floored at 0.

use std::collections::HashSet;

use crate::{
    error::FeedbackError,
    models::{
        answer::{Answer, AnswerValue},
        feedback::{ChoiceOutcome, FeedbackRecord},
        item::Item,
    },
    store::FeedbackStore,
};

/// Outcome of grading one answer against its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    /// Fractional credit in [0, 1].
    pub score: f64,
    /// Every submitted choice is correct and none is missing.
    pub correct: bool,
    pub choices: Vec<ChoiceOutcome>,
    pub wrong_answers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingMode {
    Exact,
    PartialCredit,
}

impl GradingMode {
    pub fn for_pair(submitted: &AnswerValue, expected: &AnswerValue) -> Self {
        if submitted.len() == 1 && expected.len() == 1 {
            GradingMode::Exact
        } else {
            GradingMode::PartialCredit
        }
    }
}

/// Grades and scores of a whole submission.
#[derive(Debug, Clone)]
pub struct GradedBatch {
    pub records: Vec<FeedbackRecord>,
    /// Items answered fully correctly.
    pub correct_count: usize,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Grades a submission against the item's correct answer(s).
pub fn grade(submitted: &AnswerValue, expected: &AnswerValue) -> Result<Grade, FeedbackError> {
    // Blank key choices would inflate the divisor.
    let expected_set: HashSet<String> = expected
        .choices()
        .iter()
        .map(|c| normalize(c))
        .filter(|c| !c.is_empty())
        .collect();
    if expected_set.is_empty() {
        return Err(FeedbackError::Grading(
            "item has no correct answers to grade against".to_string(),
        ));
    }

    match GradingMode::for_pair(submitted, expected) {
        GradingMode::Exact => {
            let value = &submitted.choices()[0];
            let correct = expected_set.contains(&normalize(value));
            Ok(Grade {
                score: if correct { 1.0 } else { 0.0 },
                correct,
                choices: vec![ChoiceOutcome {
                    value: value.clone(),
                    correct,
                }],
                wrong_answers: if correct { Vec::new() } else { vec![value.clone()] },
            })
        }
        GradingMode::PartialCredit => {
            let mut seen = HashSet::new();
            let mut choices = Vec::new();
            let mut wrong_answers = Vec::new();
            let mut hits: i64 = 0;
            let mut tally: i64 = 0;

            for value in submitted.choices() {
                let key = normalize(value);
                if !seen.insert(key.clone()) {
                    continue;
                }
                let correct = expected_set.contains(&key);
                if correct {
                    hits += 1;
                    tally += 1;
                } else {
                    tally -= 1;
                    wrong_answers.push(value.clone());
                }
                choices.push(ChoiceOutcome {
                    value: value.clone(),
                    correct,
                });
            }

            let total = expected_set.len() as i64;
            let score = (tally as f64 / total as f64).max(0.0);
            Ok(Grade {
                score,
                correct: wrong_answers.is_empty() && hits == total,
                choices,
                wrong_answers,
            })
        }
    }
}

/// Builds the feedback record for an already graded answer.
pub fn to_record(item: &Item, answer: &Answer, grade: Grade) -> FeedbackRecord {
    FeedbackRecord {
        answer_id: answer.id,
        question: item.question.clone(),
        subcontent: item.subcontent.clone(),
        answer: answer.text.0.clone(),
        correct_answer: item.correct_answer.0.clone(),
        correct: grade.correct,
        choices: grade.choices,
        wrong_answers: grade.wrong_answers,
        score: grade.score,
        explanation: answer.feedback_explanation.clone(),
        suggestions: answer.feedback_improve_suggestions.clone(),
    }
}

/// Grades one answer and persists its score.
pub async fn grade_answer(
    store: &dyn FeedbackStore,
    item: &Item,
    answer: &Answer,
) -> Result<FeedbackRecord, FeedbackError> {
    let grade = grade(&answer.text.0, &item.correct_answer.0)?;
    store.update_answer_score(answer.id, grade.score).await?;
    Ok(to_record(item, answer, grade))
}

/// Grades every (item, answer) pair of a submission, persisting scores.
pub async fn grade_all(
    store: &dyn FeedbackStore,
    pairs: &[(Item, Answer)],
) -> Result<GradedBatch, FeedbackError> {
    let mut records = Vec::with_capacity(pairs.len());
    for (item, answer) in pairs {
        records.push(grade_answer(store, item, answer).await?);
    }
    let correct_count = records.iter().filter(|r| r.correct).count();
    Ok(GradedBatch {
        records,
        correct_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    fn multi(values: &[&str]) -> AnswerValue {
        AnswerValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_exact_match_is_trimmed_and_case_insensitive() {
        let g = grade(&single(" Paris "), &single("paris")).unwrap();
        assert!(g.correct);
        assert_eq!(g.score, 1.0);
        assert!(g.wrong_answers.is_empty());
    }

    #[test]
    fn test_single_answer_against_one_element_list_uses_exact_mode() {
        assert_eq!(
            GradingMode::for_pair(&single("paris"), &multi(&["Paris"])),
            GradingMode::Exact
        );
        let g = grade(&single("paris"), &multi(&["Paris"])).unwrap();
        assert!(g.correct);
        assert_eq!(g.score, 1.0);
    }

    #[test]
    fn test_exact_mismatch() {
        let g = grade(&single("Lyon"), &single("Paris")).unwrap();
        assert!(!g.correct);
        assert_eq!(g.score, 0.0);
        assert_eq!(g.wrong_answers, vec!["Lyon".to_string()]);
    }

    #[test]
    fn test_full_set_scores_one() {
        let g = grade(&multi(&["B", "A"]), &multi(&["A", "B"])).unwrap();
        assert!(g.correct);
        assert_eq!(g.score, 1.0);
    }

    #[test]
    fn test_one_right_one_wrong_cancels_out() {
        let g = grade(&multi(&["A", "C"]), &multi(&["A", "B"])).unwrap();
        assert!(!g.correct);
        assert_eq!(g.score, 0.0);
        assert_eq!(g.wrong_answers, vec!["C".to_string()]);
        assert_eq!(
            g.choices,
            vec![
                ChoiceOutcome { value: "A".into(), correct: true },
                ChoiceOutcome { value: "C".into(), correct: false },
            ]
        );
    }

    #[test]
    fn test_incomplete_selection_gets_partial_credit() {
        let g = grade(&multi(&["A"]), &multi(&["A", "B"])).unwrap();
        assert!(!g.correct);
        assert_eq!(g.score, 0.5);
        assert!(g.wrong_answers.is_empty());
    }

    #[test]
    fn test_all_wrong_is_floored_at_zero() {
        let g = grade(&multi(&["C", "D", "E"]), &multi(&["A", "B"])).unwrap();
        assert_eq!(g.score, 0.0);
        assert_eq!(g.wrong_answers.len(), 3);
    }

    #[test]
    fn test_duplicates_do_not_inflate_score() {
        let g = grade(&multi(&["A", "a ", "A"]), &multi(&["A", "B"])).unwrap();
        assert_eq!(g.score, 0.5);
        assert_eq!(g.choices.len(), 1);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let key = multi(&["A", "B", "C"]);
        let submissions = [
            multi(&[]),
            multi(&["A"]),
            multi(&["A", "B", "C", "D"]),
            multi(&["D", "E", "F", "G"]),
            multi(&["A", "B", "C"]),
        ];
        for s in &submissions {
            let g = grade(s, &key).unwrap();
            assert!((0.0..=1.0).contains(&g.score), "{:?} -> {}", s, g.score);
        }
    }

    #[test]
    fn test_blank_key_choice_is_ignored() {
        let g = grade(&multi(&["A"]), &multi(&["A", " "])).unwrap();
        assert!(g.correct);
        assert_eq!(g.score, 1.0);
    }

    #[test]
    fn test_empty_key_is_a_grading_error() {
        let err = grade(&single("A"), &multi(&[])).unwrap_err();
        assert!(matches!(err, FeedbackError::Grading(_)));
    }
}
