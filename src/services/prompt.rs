// src/services/prompt.rs

//! Prompt construction for formative feedback.
//!
//! Prompts are written in Brazilian Portuguese, the language the feedback is
//! delivered in. The model is asked to split its answer into two sections
//! introduced by [`EXPLANATION_MARKER`] and [`SUGGESTIONS_MARKER`]; the
//! generator splits the completion on those exact strings.

use std::collections::HashSet;

use crate::models::{chat_settings::ModelTier, feedback::FeedbackRecord};

pub const EXPLANATION_MARKER: &str = "Explicação:";
pub const SUGGESTIONS_MARKER: &str = "Sugestões de estudo:";

/// Tokens kept free below the budget for the model's own overhead.
const TOKEN_MARGIN: i32 = 50;
/// Budgets at or below this are used as-is.
const SMALL_BUDGET: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    SingleAnswer,
    MultiAnswer,
}

impl Template {
    pub fn for_record(record: &FeedbackRecord) -> Self {
        if record.answer.len() > 1 || record.correct_answer.len() > 1 {
            Template::MultiAnswer
        } else {
            Template::SingleAnswer
        }
    }

    pub fn tier(self) -> ModelTier {
        match self {
            Template::SingleAnswer => ModelTier::Principal,
            Template::MultiAnswer => ModelTier::Special,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub template: Template,
    pub tier: ModelTier,
}

/// How a multi-select submission went, in one of three canned phrasings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceSummary {
    NothingRight { wrong: Vec<String> },
    RightButIncomplete { right: Vec<String>, missing: Vec<String> },
    Mixed { right: Vec<String>, wrong: Vec<String> },
}

impl ChoiceSummary {
    pub fn from_record(record: &FeedbackRecord) -> Self {
        let right: Vec<String> = record
            .choices
            .iter()
            .filter(|c| c.correct)
            .map(|c| c.value.clone())
            .collect();

        if right.is_empty() {
            return ChoiceSummary::NothingRight {
                wrong: record.wrong_answers.clone(),
            };
        }

        if record.wrong_answers.is_empty() {
            let submitted: HashSet<String> =
                right.iter().map(|v| v.trim().to_lowercase()).collect();
            let missing = record
                .correct_answer
                .choices()
                .iter()
                .filter(|c| !submitted.contains(&c.trim().to_lowercase()))
                .cloned()
                .collect();
            return ChoiceSummary::RightButIncomplete { right, missing };
        }

        ChoiceSummary::Mixed {
            right,
            wrong: record.wrong_answers.clone(),
        }
    }

    pub fn sentence(&self) -> String {
        match self {
            ChoiceSummary::NothingRight { wrong } => format!(
                "O aluno não acertou nenhuma das alternativas. Alternativas marcadas incorretamente: {}.",
                list_or_none(wrong)
            ),
            ChoiceSummary::RightButIncomplete { right, missing } => format!(
                "O aluno acertou todas as alternativas que marcou ({}), mas não marcou todas as corretas. Faltaram: {}.",
                list_or_none(right),
                list_or_none(missing)
            ),
            ChoiceSummary::Mixed { right, wrong } => format!(
                "O aluno acertou as alternativas {}, mas marcou incorretamente {}.",
                list_or_none(right),
                list_or_none(wrong)
            ),
        }
    }
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "nenhuma".to_string()
    } else {
        values.join(", ")
    }
}

/// Output length asked of the model for a given budget.
pub fn length_cap(token_budget: i32) -> i32 {
    if token_budget <= SMALL_BUDGET {
        token_budget
    } else {
        token_budget - TOKEN_MARGIN
    }
}

fn closing_instructions(cap: i32) -> String {
    format!(
        "Organize a resposta em duas seções, iniciadas exatamente pelos rótulos \
         \"{EXPLANATION_MARKER}\" e \"{SUGGESTIONS_MARKER}\", nesta ordem.\n\
         Não use formatação de texto rico (negrito, itálico, títulos ou listas em markdown).\n\
         A resposta completa deve ter no máximo {cap} tokens."
    )
}

/// Builds the prompt for one answer.
pub fn build_prompt(record: &FeedbackRecord, questionnaire_content: &str, token_budget: i32) -> Prompt {
    let template = Template::for_record(record);
    let cap = length_cap(token_budget);

    let text = match template {
        Template::SingleAnswer => format!(
            "Questão: {question}\n\
             Resposta do aluno: {answer}\n\
             Resposta correta: {correct}\n\
             Conteúdo do questionário: {content}\n\
             Subconteúdo: {subcontent}\n\n\
             Com base nessas informações:\n\
             1. Explique por que a resposta do aluno está incorreta e qual é a resposta correta, \
             relacionando o erro com o conteúdo e o subconteúdo.\n\
             2. Sugira tópicos de estudo para o aluno melhorar nesse assunto.\n\n\
             {closing}",
            question = record.question,
            answer = record.answer,
            correct = record.correct_answer,
            content = questionnaire_content,
            subcontent = record.subcontent,
            closing = closing_instructions(cap),
        ),
        Template::MultiAnswer => format!(
            "Questão: {question}\n\
             Respostas do aluno: {answer}\n\
             Respostas corretas: {correct}\n\
             Conteúdo do questionário: {content}\n\
             Subconteúdo: {subcontent}\n\
             Resumo: {summary}\n\n\
             Com base nessas informações:\n\
             1. Explique quais alternativas o aluno errou ou deixou de marcar e por quê, \
             indicando as respostas corretas e relacionando o erro com o conteúdo e o subconteúdo.\n\
             2. Sugira tópicos de estudo para o aluno melhorar nesse assunto.\n\n\
             {closing}",
            question = record.question,
            answer = record.answer,
            correct = record.correct_answer,
            content = questionnaire_content,
            subcontent = record.subcontent,
            summary = ChoiceSummary::from_record(record).sentence(),
            closing = closing_instructions(cap),
        ),
    };

    Prompt {
        text,
        template,
        tier: template.tier(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::answer::AnswerValue, services::grader};

    fn record(answer: AnswerValue, correct_answer: AnswerValue) -> FeedbackRecord {
        let g = grader::grade(&answer, &correct_answer).unwrap();
        FeedbackRecord {
            answer_id: uuid::Uuid::new_v4(),
            question: "Quais são cores primárias?".into(),
            subcontent: "Cores".into(),
            answer,
            correct_answer,
            correct: g.correct,
            choices: g.choices,
            wrong_answers: g.wrong_answers,
            score: g.score,
            explanation: None,
            suggestions: None,
        }
    }

    fn multi(values: &[&str]) -> AnswerValue {
        AnswerValue::Multiple(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_length_cap() {
        assert_eq!(length_cap(500), 450);
        assert_eq!(length_cap(101), 51);
        assert_eq!(length_cap(100), 100);
        assert_eq!(length_cap(60), 60);
    }

    #[test]
    fn test_single_answer_template() {
        let r = record(AnswerValue::Single("Lyon".into()), AnswerValue::Single("Paris".into()));
        let p = build_prompt(&r, "Geografia", 300);
        assert_eq!(p.template, Template::SingleAnswer);
        assert_eq!(p.tier, ModelTier::Principal);
        assert!(p.text.contains("Resposta do aluno: Lyon"));
        assert!(p.text.contains("Resposta correta: Paris"));
        assert!(p.text.contains("Conteúdo do questionário: Geografia"));
        assert!(p.text.contains("Subconteúdo: Cores"));
        assert!(p.text.contains(EXPLANATION_MARKER));
        assert!(p.text.contains(SUGGESTIONS_MARKER));
        assert!(p.text.contains("no máximo 250 tokens"));
        assert!(!p.text.contains("Resumo:"));
    }

    #[test]
    fn test_two_correct_answers_always_select_multi_template() {
        let r = record(AnswerValue::Single("A".into()), multi(&["A", "B"]));
        let p = build_prompt(&r, "Artes", 80);
        assert_eq!(p.template, Template::MultiAnswer);
        assert_eq!(p.tier, ModelTier::Special);
        assert!(p.text.contains("no máximo 80 tokens"));
    }

    #[test]
    fn test_multiple_submitted_answers_select_multi_template() {
        let r = record(multi(&["A", "B"]), AnswerValue::Single("A".into()));
        assert_eq!(Template::for_record(&r), Template::MultiAnswer);
    }

    #[test]
    fn test_choice_summary_phrasings() {
        let nothing = record(multi(&["C", "D"]), multi(&["A", "B"]));
        assert_eq!(
            ChoiceSummary::from_record(&nothing),
            ChoiceSummary::NothingRight { wrong: vec!["C".into(), "D".into()] }
        );

        let incomplete = record(multi(&["A"]), multi(&["A", "B"]));
        assert_eq!(
            ChoiceSummary::from_record(&incomplete),
            ChoiceSummary::RightButIncomplete { right: vec!["A".into()], missing: vec!["B".into()] }
        );

        let mixed = record(multi(&["A", "C"]), multi(&["A", "B"]));
        let summary = ChoiceSummary::from_record(&mixed);
        assert_eq!(
            summary,
            ChoiceSummary::Mixed { right: vec!["A".into()], wrong: vec!["C".into()] }
        );
        assert_eq!(
            summary.sentence(),
            "O aluno acertou as alternativas A, mas marcou incorretamente C."
        );

        let p = build_prompt(&mixed, "Artes", 300);
        assert!(p.text.contains("Resumo: O aluno acertou as alternativas A"));
    }
}
