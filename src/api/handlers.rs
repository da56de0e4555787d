use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    bot::{ChatUpdate, Reply},
    error::AppResult,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Replies the transport should deliver for one update
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub replies: Vec<Reply>,
}

/// Handler for one chat-platform update
pub async fn handle_update(
    State(state): State<AppState>,
    Json(update): Json<ChatUpdate>,
) -> AppResult<Json<UpdateResponse>> {
    let chat_id = update.chat_id();
    let replies = state.engine.handle(update).await?;

    tracing::debug!(chat_id, replies = replies.len(), "Update handled");
    Ok(Json(UpdateResponse { replies }))
}
