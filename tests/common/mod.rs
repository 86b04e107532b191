// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use feedfor::{
    config::{Config, DEFAULT_OPENAI_BASE_URL},
    error::AppError,
    llm::{ChatClient, ChatRequest, LlmError, RetryPolicy},
    mailer::{FeedbackEmail, Mailer, ReportEmail},
    models::chat_settings::{ChatSettings, CreateChatSettingsRequest},
    routes,
    state::AppState,
    store::{FeedbackStore, MemoryStore},
    utils::jwt::{ROLE_ADMIN, ROLE_CLIENT, sign_jwt},
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Answers every completion with the same reply and keeps the requests.
pub struct StubLlm {
    pub reply: Result<String, LlmError>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl ChatClient for StubLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub feedback: Mutex<Vec<FeedbackEmail>>,
    pub reports: Mutex<Vec<ReportEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_feedback(&self, email: FeedbackEmail) -> Result<(), AppError> {
        self.feedback.lock().unwrap().push(email);
        Ok(())
    }

    async fn send_report(&self, email: ReportEmail) -> Result<(), AppError> {
        self.reports.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<StubLlm>,
    pub mailer: Arc<RecordingMailer>,
    pub client_token: String,
    pub admin_token: String,
    pub settings: ChatSettings,
}

impl TestApp {
    pub fn llm_calls(&self) -> Vec<ChatRequest> {
        self.llm.requests.lock().unwrap().clone()
    }

    /// Waits until the background jobs have handed `count` feedback emails off.
    pub async fn wait_for_feedback_emails(&self, count: usize) -> Vec<FeedbackEmail> {
        for _ in 0..100 {
            {
                let sent = self.mailer.feedback.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Timed out waiting for {} feedback emails", count);
    }

    pub async fn wait_for_reports(&self, count: usize) -> Vec<ReportEmail> {
        for _ in 0..100 {
            {
                let sent = self.mailer.reports.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Timed out waiting for {} reports", count);
    }
}

pub const MARKED_REPLY: &str =
    "Explicação: A alternativa B também era correta.\nSugestões de estudo: Revise o capítulo 3.";

/// Spawns the app on a random port, backed by the in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_reply(Ok(MARKED_REPLY.to_string())).await
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        openai_base_url: DEFAULT_OPENAI_BASE_URL.parse().unwrap(),
        llm_timeout_secs: 5,
        llm_max_attempts: 1,
        llm_backoff_ms: 0,
        mail_from: "feedback@example.com".to_string(),
        warnings: Vec::new(),
    }
}

pub fn chat_settings_request() -> CreateChatSettingsRequest {
    CreateChatSettingsRequest {
        openai_api_key: "sk-test".to_string(),
        principal_model: "gpt-principal".to_string(),
        special_model: "gpt-special".to_string(),
        system_content_instructions: "Você é um tutor paciente.".to_string(),
        max_tokens: 300,
        temperature: 0.5,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
    }
}

/// Binds the router to a random port and returns its base URL.
pub async fn serve(state: AppState) -> String {
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn client_token() -> String {
    sign_jwt("lms", ROLE_CLIENT, JWT_SECRET, 600).unwrap()
}

pub async fn spawn_app_with_reply(reply: Result<String, LlmError>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let settings = store
        .create_chat_settings(&chat_settings_request())
        .await
        .unwrap();

    let llm = Arc::new(StubLlm {
        reply,
        requests: Mutex::new(Vec::new()),
    });
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState {
        store: store.clone(),
        llm: llm.clone(),
        mailer: mailer.clone(),
        retry: RetryPolicy::once(),
        config: test_config(""),
    };

    let address = serve(state).await;

    TestApp {
        address,
        store,
        llm,
        mailer,
        client_token: client_token(),
        admin_token: sign_jwt("ops", ROLE_ADMIN, JWT_SECRET, 600).unwrap(),
        settings,
    }
}

/// A one-item submission body.
pub fn submission(
    settings_id: uuid::Uuid,
    student_email: &str,
    answer: serde_json::Value,
    correct_answer: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "questionnaire_title": "Geografia",
        "questionnaire_content": "Capitais e cores",
        "questionnaire_external_id": "quiz-42",
        "student_email": student_email,
        "subject_code": "GEO101",
        "subject_name": "Geografia Geral",
        "teacher_email": "prof@example.com",
        "chat_id": settings_id,
        "items": [{
            "question": "Pergunta 1",
            "answer": answer,
            "subcontent": "Europa",
            "correct_answer": correct_answer
        }]
    })
}
