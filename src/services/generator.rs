// src/services/generator.rs

//! Drives feedback generation for one graded submission.
//!
//! Each answer moves through `Pending -> Skipped` on a cache hit, or
//! `Pending -> CallingLlm -> LlmOk -> Saved`. Any failure ends in
//! `Failed(reason)`, is logged, and the batch moves on to the next answer.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::FeedbackError,
    llm::{ChatClient, ChatRequest, RetryPolicy},
    models::{chat_settings::ChatSettings, feedback::FeedbackRecord},
    services::{
        feedback_cache::{self, CacheDecision},
        prompt::{self, EXPLANATION_MARKER, SUGGESTIONS_MARKER},
    },
    store::FeedbackStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackState {
    Pending,
    Skipped(CacheDecision),
    CallingLlm,
    LlmOk,
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub answer_id: Uuid,
    pub state: FeedbackState,
}

/// Final state of every answer in a run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AnswerOutcome>,
}

impl BatchReport {
    fn count(&self, f: impl Fn(&FeedbackState) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.state)).count()
    }

    pub fn saved(&self) -> usize {
        self.count(|s| matches!(s, FeedbackState::Saved))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FeedbackState::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FeedbackState::Failed(_)))
    }
}

/// A completion split into its two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sections {
    Marked {
        explanation: String,
        suggestions: String,
    },
    /// No marker found: the whole text is the explanation.
    Unmarked(String),
}

impl Sections {
    pub fn into_parts(self) -> (String, String) {
        match self {
            Sections::Marked {
                explanation,
                suggestions,
            } => (explanation, suggestions),
            Sections::Unmarked(text) => (text, String::new()),
        }
    }
}

/// Splits a completion on the explanation and suggestions markers.
/// Either marker may be missing, and they may appear in any order.
pub fn parse_sections(text: &str) -> Sections {
    let explanation_at = text.find(EXPLANATION_MARKER);
    let suggestions_at = text.find(SUGGESTIONS_MARKER);

    match (explanation_at, suggestions_at) {
        (None, None) => Sections::Unmarked(text.trim().to_string()),
        (Some(e), None) => Sections::Marked {
            explanation: text[e + EXPLANATION_MARKER.len()..].trim().to_string(),
            suggestions: String::new(),
        },
        (None, Some(s)) => Sections::Marked {
            explanation: text[..s].trim().to_string(),
            suggestions: text[s + SUGGESTIONS_MARKER.len()..].trim().to_string(),
        },
        (Some(e), Some(s)) => {
            let e_body = e + EXPLANATION_MARKER.len();
            let s_body = s + SUGGESTIONS_MARKER.len();
            let (explanation, suggestions) = if e < s {
                (&text[e_body..s], &text[s_body..])
            } else {
                (&text[e_body..], &text[s_body..e])
            };
            Sections::Marked {
                explanation: explanation.trim().to_string(),
                suggestions: suggestions.trim().to_string(),
            }
        }
    }
}

pub struct FeedbackGenerator {
    store: Arc<dyn FeedbackStore>,
    client: Arc<dyn ChatClient>,
    settings: ChatSettings,
    retry: RetryPolicy,
}

impl FeedbackGenerator {
    pub fn new(
        store: Arc<dyn FeedbackStore>,
        client: Arc<dyn ChatClient>,
        settings: ChatSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            client,
            settings,
            retry,
        }
    }

    /// Generates missing feedback for every record, writing the new text back
    /// into the records and onto the stored answers.
    pub async fn run(&self, records: &mut [FeedbackRecord], content: &str) -> BatchReport {
        let mut report = BatchReport::default();

        for record in records.iter_mut() {
            let answer_id = record.answer_id;
            debug!(%answer_id, state = ?FeedbackState::Pending, "Feedback state");

            let decision = feedback_cache::needs_regeneration(record);
            let state = if decision.is_skip() {
                debug!(%answer_id, ?decision, "Skipping feedback generation");
                FeedbackState::Skipped(decision)
            } else {
                match self.generate_one(record, content).await {
                    Ok(()) => FeedbackState::Saved,
                    Err(e) => {
                        warn!(%answer_id, error = %e, "Feedback generation failed, continuing");
                        FeedbackState::Failed(e.to_string())
                    }
                }
            };

            report.outcomes.push(AnswerOutcome { answer_id, state });
        }

        info!(
            total = report.outcomes.len(),
            saved = report.saved(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Feedback batch finished"
        );
        report
    }

    async fn generate_one(
        &self,
        record: &mut FeedbackRecord,
        content: &str,
    ) -> Result<(), FeedbackError> {
        let prompt = prompt::build_prompt(record, content, self.settings.max_tokens);
        let request = ChatRequest {
            api_key: self.settings.openai_api_key.clone(),
            model: self.settings.model_for(prompt.tier).to_string(),
            system: self.settings.system_content_instructions.clone(),
            user: prompt.text,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: self.settings.top_p,
            frequency_penalty: self.settings.frequency_penalty,
            presence_penalty: self.settings.presence_penalty,
        };

        debug!(answer_id = %record.answer_id, state = ?FeedbackState::CallingLlm, tier = ?prompt.tier, "Feedback state");
        let text = self
            .retry
            .complete(self.client.as_ref(), &request)
            .await
            .map_err(|e| FeedbackError::generation("llm", e))?;
        debug!(answer_id = %record.answer_id, state = ?FeedbackState::LlmOk, "Feedback state");

        let sections = parse_sections(&text);
        if matches!(sections, Sections::Unmarked(_)) {
            warn!(answer_id = %record.answer_id, "Completion has no section markers");
        }
        let (explanation, suggestions) = sections.into_parts();

        self.store
            .update_answer_feedback(record.answer_id, &explanation, &suggestions)
            .await
            .map_err(|e| FeedbackError::generation("store", e))?;

        record.explanation = Some(explanation);
        record.suggestions = Some(suggestions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::LlmError,
        models::answer::AnswerValue,
        services::grader,
        store::MemoryStore,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned completions in order and records every request.
    struct Scripted {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<String, LlmError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for Scripted {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn settings() -> ChatSettings {
        ChatSettings {
            id: Uuid::new_v4(),
            openai_api_key: "sk-test".into(),
            principal_model: "principal".into(),
            special_model: "special".into(),
            system_content_instructions: "Você é um tutor.".into(),
            max_tokens: 300,
            temperature: 0.2,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            created_at: chrono::Utc::now(),
        }
    }

    async fn stored_record(
        store: &MemoryStore,
        question: &str,
        answer: AnswerValue,
        correct: AnswerValue,
    ) -> FeedbackRecord {
        let qid = Uuid::new_v4();
        let item = store
            .get_or_create_item(qid, question, "Sub", &correct)
            .await
            .unwrap();
        let stored = store.get_or_create_answer(item.id, &answer).await.unwrap();
        grader::grade_answer(store, &item, &stored).await.unwrap()
    }

    fn generator(store: Arc<MemoryStore>, client: Arc<Scripted>) -> FeedbackGenerator {
        FeedbackGenerator::new(store, client, settings(), RetryPolicy::once())
    }

    #[test]
    fn test_parse_marked_sections() {
        let text = "Explicação: Paris é a capital.\nSugestões de estudo: Revise geografia.";
        assert_eq!(
            parse_sections(text),
            Sections::Marked {
                explanation: "Paris é a capital.".into(),
                suggestions: "Revise geografia.".into(),
            }
        );
    }

    #[test]
    fn test_parse_reversed_and_partial_markers() {
        let reversed = "Sugestões de estudo: Leia o capítulo 2.\nExplicação: A resposta era B.";
        assert_eq!(
            parse_sections(reversed).into_parts(),
            ("A resposta era B.".to_string(), "Leia o capítulo 2.".to_string())
        );

        let only_suggestions = "A resposta era B.\nSugestões de estudo: Leia o capítulo 2.";
        assert_eq!(
            parse_sections(only_suggestions).into_parts(),
            ("A resposta era B.".to_string(), "Leia o capítulo 2.".to_string())
        );
    }

    #[test]
    fn test_unmarked_text_becomes_explanation() {
        let sections = parse_sections("  Você confundiu os conceitos.  ");
        assert_eq!(sections, Sections::Unmarked("Você confundiu os conceitos.".into()));
        assert_eq!(
            sections.into_parts(),
            ("Você confundiu os conceitos.".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_correct_answer_makes_no_llm_call() {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(Scripted::new(vec![]));
        let mut records = vec![
            stored_record(
                &store,
                "Capital da França?",
                AnswerValue::Single("Paris".into()),
                AnswerValue::Single("Paris".into()),
            )
            .await,
        ];

        let report = generator(store, client.clone()).run(&mut records, "Geografia").await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.outcomes[0].state,
            FeedbackState::Skipped(CacheDecision::FullyCorrect)
        );
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_multi_answer_uses_special_model_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(Scripted::new(vec![Ok(
            "Explicação: B também era correta.\nSugestões de estudo: Revise cores primárias.".into(),
        )]));
        let mut records = vec![
            stored_record(
                &store,
                "Cores primárias?",
                AnswerValue::Multiple(vec!["A".into(), "C".into()]),
                AnswerValue::Multiple(vec!["A".into(), "B".into()]),
            )
            .await,
        ];

        let report = generator(store.clone(), client.clone())
            .run(&mut records, "Artes")
            .await;

        assert_eq!(report.saved(), 1);
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "special");
        assert_eq!(requests[0].system, "Você é um tutor.");
        assert!(requests[0].user.contains("Resumo:"));

        assert_eq!(records[0].explanation.as_deref(), Some("B também era correta."));
        let stored = store.answers().await;
        let answer = stored.iter().find(|a| a.id == records[0].answer_id).unwrap();
        assert_eq!(
            answer.feedback_improve_suggestions.as_deref(),
            Some("Revise cores primárias.")
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(Scripted::new(vec![
            Err(LlmError::Status { status: 500, message: "boom".into() }),
            Ok("Texto sem marcadores.".into()),
        ]));
        let mut records = vec![
            stored_record(
                &store,
                "Q1",
                AnswerValue::Single("x".into()),
                AnswerValue::Single("y".into()),
            )
            .await,
            stored_record(
                &store,
                "Q2",
                AnswerValue::Single("x".into()),
                AnswerValue::Single("z".into()),
            )
            .await,
        ];

        let report = generator(store, client.clone()).run(&mut records, "C").await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.saved(), 1);
        assert!(matches!(report.outcomes[0].state, FeedbackState::Failed(_)));
        assert_eq!(client.requests.lock().unwrap()[1].model, "principal");
        assert!(records[0].explanation.is_none());
        assert_eq!(records[1].explanation.as_deref(), Some("Texto sem marcadores."));
        assert_eq!(records[1].suggestions.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_cached_feedback_is_reused() {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(Scripted::new(vec![]));
        let mut record = stored_record(
            &store,
            "Q",
            AnswerValue::Single("x".into()),
            AnswerValue::Single("y".into()),
        )
        .await;
        record.explanation = Some("já explicado".into());
        record.suggestions = Some("já sugerido".into());

        let report = generator(store, client.clone())
            .run(std::slice::from_mut(&mut record), "C")
            .await;

        assert_eq!(report.outcomes[0].state, FeedbackState::Skipped(CacheDecision::Cached));
        assert!(client.requests.lock().unwrap().is_empty());
    }
}
