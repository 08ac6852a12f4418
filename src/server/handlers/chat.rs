use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::types::build_conversation;
use crate::llm::Message;
use crate::server::handlers::{json_body, required_text, MESSAGE_REQUIRED};
use crate::server::{ApiError, AppState, Backend};

const SYSTEM_PROMPT: &str = "당신은 한국농어촌공사의 AI 어시스턴트입니다. 친근하고 전문적으로 답변해주세요. \
금융 관련 질문에는 정확한 정보를 제공하되, 투자 권유는 하지 마세요.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    conversation_history: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    success: bool,
    response: String,
    usage: Option<Value>,
    model: String,
}

/// `POST /api/openai-chat`
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let body = json_body(body)?;
    let message = required_text(&body.message)
        .ok_or_else(|| ApiError::BadRequest(MESSAGE_REQUIRED.to_string()))?;

    let options = state.openai.chat_options();
    let messages = build_conversation(
        SYSTEM_PROMPT,
        &body.conversation_history,
        state.config.openai.history_window,
        message,
    );

    tracing::info!(
        model = %options.model,
        message_count = messages.len(),
        "chat request"
    );

    let completion = state
        .openai
        .chat(&messages, &options)
        .await
        .map_err(|e| ApiError::upstream(Backend::OpenAi, e))?;

    tracing::info!(response_len = completion.content.len(), "chat response");

    Ok(Json(ChatResponse {
        success: true,
        response: completion.content,
        usage: completion.usage,
        model: options.model,
    }))
}
