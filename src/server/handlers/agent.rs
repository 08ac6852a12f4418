use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{AgentReply, AgentRequest};
use crate::server::handlers::{json_body, required_text, MESSAGE_REQUIRED};
use crate::server::{ApiError, AppState, Backend};

const DEFAULT_USER: &str = "default_user";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBody {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    files: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    success: bool,
    #[serde(flatten)]
    reply: AgentReply,
}

/// `POST /api/personal-agent-chat`
pub async fn personal_agent_chat(
    State(state): State<AppState>,
    body: Result<Json<AgentBody>, JsonRejection>,
) -> Result<Json<AgentResponse>, ApiError> {
    let body = json_body(body)?;
    let message = required_text(&body.message)
        .ok_or_else(|| ApiError::BadRequest(MESSAGE_REQUIRED.to_string()))?;

    let request = AgentRequest {
        message: message.to_string(),
        conversation_id: body.conversation_id.unwrap_or_default(),
        user_id: body
            .user_id
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string()),
        files: body.files,
    };

    let reply = state
        .agent
        .send(&request)
        .await
        .map_err(|e| ApiError::upstream(Backend::PersonalAgent, e))?;

    Ok(Json(AgentResponse {
        success: true,
        reply,
    }))
}
