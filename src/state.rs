// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, llm::ChatClient, llm::RetryPolicy, mailer::Mailer, store::FeedbackStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeedbackStore>,
    pub llm: Arc<dyn ChatClient>,
    pub mailer: Arc<dyn Mailer>,
    pub retry: RetryPolicy,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
