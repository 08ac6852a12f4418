pub mod agent;
pub mod chat;
pub mod image_proxy;
pub mod web_search;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::server::ApiError;

const INVALID_JSON: &str = "잘못된 JSON 형식입니다.";
pub(crate) const MESSAGE_REQUIRED: &str = "메시지가 필요합니다.";

/// `OPTIONS` without CORS request headers (CORS preflights are answered by the layer)
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Unwrap a JSON body, turning any rejection into a 400
pub(crate) fn json_body<T: DeserializeOwned>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected request body");
            Err(ApiError::BadRequest(INVALID_JSON.to_string()))
        }
    }
}

/// A non-empty string field, mirroring a `typeof x === "string" && x` check
pub(crate) fn required_text(value: &serde_json::Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
