// src/services/feedback_cache.rs

use crate::models::feedback::FeedbackRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Nothing to explain.
    FullyCorrect,
    /// Explanation and suggestions are already stored on the answer.
    Cached,
    /// At least one section is missing, ask the model.
    Missing,
}

impl CacheDecision {
    pub fn is_skip(self) -> bool {
        !matches!(self, CacheDecision::Missing)
    }
}

fn populated(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

pub fn needs_regeneration(record: &FeedbackRecord) -> CacheDecision {
    if record.correct {
        CacheDecision::FullyCorrect
    } else if populated(&record.explanation) && populated(&record.suggestions) {
        CacheDecision::Cached
    } else {
        CacheDecision::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::AnswerValue;

    fn record(correct: bool, explanation: Option<&str>, suggestions: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            answer_id: uuid::Uuid::new_v4(),
            question: "Q".into(),
            subcontent: "S".into(),
            answer: AnswerValue::Single("x".into()),
            correct_answer: AnswerValue::Single("y".into()),
            correct,
            choices: Vec::new(),
            wrong_answers: Vec::new(),
            score: if correct { 1.0 } else { 0.0 },
            explanation: explanation.map(str::to_string),
            suggestions: suggestions.map(str::to_string),
        }
    }

    #[test]
    fn test_correct_answer_is_skipped() {
        assert_eq!(needs_regeneration(&record(true, None, None)), CacheDecision::FullyCorrect);
    }

    #[test]
    fn test_cached_wrong_answer_is_skipped() {
        let decision = needs_regeneration(&record(false, Some("why"), Some("study")));
        assert_eq!(decision, CacheDecision::Cached);
        assert!(decision.is_skip());
    }

    #[test]
    fn test_partial_or_blank_cache_regenerates() {
        assert_eq!(needs_regeneration(&record(false, Some("why"), None)), CacheDecision::Missing);
        assert_eq!(needs_regeneration(&record(false, None, Some("study"))), CacheDecision::Missing);
        assert_eq!(
            needs_regeneration(&record(false, Some("why"), Some("  "))),
            CacheDecision::Missing
        );
        assert!(!CacheDecision::Missing.is_skip());
    }
}
