//! Chat endpoints.
//!
//! Anonymous users get limited replies that are never stored. Logged-in users
//! get full replies, stored in their chat history when the database is up.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::Blueprint;
use crate::chatbot::ChatReply;
use crate::db::ChatRecord;
use crate::error::AppError;
use crate::middleware::{ApiJson, CurrentUser};
use crate::state::AppState;

pub fn blueprint() -> Blueprint {
    Blueprint::new(
        "chatbot",
        Router::new()
            .route("/chat", post(chat))
            .route("/chat/status", get(status)),
    )
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

pub async fn status(Extension(current_user): Extension<CurrentUser>) -> Json<Value> {
    Json(json!({
        "is_logged_in": current_user.is_logged_in(),
        "username": current_user.0.as_ref().map(|u| u.username.as_str()),
    }))
}

#[instrument(name = "chatbot::chat", skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".into()));
    }

    let Some(user) = current_user.0.as_ref() else {
        return Ok(Json(state.chatbot.limited_reply(message)));
    };

    let reply = state.chatbot.full_reply(message).await;

    match state.db.as_ref() {
        Some(db) => {
            let record = ChatRecord::new(
                user.user_id.clone(),
                message.to_string(),
                reply.response.clone(),
            );
            if let Err(e) = db.insert_chat(&record).await {
                tracing::error!(error = %e, "Failed to store chat");
            }
        }
        None => tracing::debug!("No database, chat not stored"),
    }

    Ok(Json(reply))
}
