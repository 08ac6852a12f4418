use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::llm::Message;
use crate::server::handlers::{json_body, required_text};
use crate::server::{ApiError, AppState, Backend};

const QUERY_REQUIRED: &str = "검색 쿼리가 필요합니다.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchBody {
    #[serde(default)]
    query: Value,
    #[serde(default)]
    conversation_history: Vec<Message>,
}

/// `POST /api/openai-web-search`
///
/// A degraded answer (every upstream call failed) is still a full body,
/// sent with status 500 and `success: false`.
pub async fn web_search(
    State(state): State<AppState>,
    body: Result<Json<WebSearchBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(body)?;
    let query = required_text(&body.query)
        .ok_or_else(|| ApiError::BadRequest(QUERY_REQUIRED.to_string()))?;

    let outcome = state
        .orchestrator
        .run(query, &body.conversation_history)
        .await
        .map_err(|e| ApiError::upstream(Backend::OpenAi, e))?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)).into_response())
}
