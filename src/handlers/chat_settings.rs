// src/handlers/chat_settings.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError, models::chat_settings::CreateChatSettingsRequest, state::AppState,
    utils::json::AppJson,
};

/// Lists all chat settings.
/// Admin only.
pub async fn list_chat_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.store.list_chat_settings().await?;
    Ok(Json(settings))
}

/// Admin only.
pub async fn create_chat_settings(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateChatSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let settings = state.store.create_chat_settings(&payload).await?;
    tracing::info!(id = %settings.id, "Chat settings created");

    Ok((StatusCode::CREATED, Json(settings)))
}

pub async fn get_chat_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state
        .store
        .get_chat_settings(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat settings {} not found", id)))?;
    Ok(Json(settings))
}
