use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::llm::LlmError;
use crate::logging::redact_secrets;

const SERVER_ERROR: &str = "서버 오류가 발생했습니다.";
const RATE_LIMITED: &str = "API 요청 한도에 도달했습니다. 잠시 후 다시 시도해주세요.";

/// Upstream backend an error came from, for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    PersonalAgent,
}

impl Backend {
    fn label(self) -> &'static str {
        match self {
            Backend::OpenAi => "OpenAI",
            Backend::PersonalAgent => "개인 AI Agent",
        }
    }

    fn key_variable(self) -> &'static str {
        match self {
            Backend::OpenAi => "OPENAI_API_KEY",
            Backend::PersonalAgent => "PERSONAL_AGENT_API_KEY",
        }
    }
}

/// Errors returned by handlers; the only place errors become HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{backend:?} upstream error: {source}")]
    Upstream {
        backend: Backend,
        #[source]
        source: LlmError,
    },

    /// The image host answered with a non-success status
    #[error("image fetch failed with {0}")]
    ImageFetch(StatusCode),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn upstream(backend: Backend, source: LlmError) -> Self {
        ApiError::Upstream { backend, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": message }),
            ),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "success": false, "error": "Method not allowed" }),
            ),
            ApiError::Upstream { backend, source } => upstream_response(*backend, source),
            ApiError::ImageFetch(status) => (*status, json!({ "error": "Failed to fetch image" })),
            ApiError::Proxy(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Proxy error", "message": message }),
            ),
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": SERVER_ERROR, "details": details }),
            ),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %redact_secrets(&self.to_string()), "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

fn upstream_response(backend: Backend, error: &LlmError) -> (StatusCode, serde_json::Value) {
    let label = backend.label();
    match error {
        LlmError::MissingApiKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "success": false,
                "error": format!("{label} API 키가 설정되지 않았습니다."),
                "debug": format!("환경변수 또는 설정 파일에 {}를 설정하세요.", backend.key_variable()),
            }),
        ),
        _ => match error.status() {
            Some(401) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": format!("{label} API 키가 유효하지 않습니다.") }),
            ),
            Some(429) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "success": false, "error": RATE_LIMITED }),
            ),
            Some(503) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "success": false,
                    "error": format!("{label} 서비스가 일시적으로 사용할 수 없습니다."),
                }),
            ),
            _ => {
                let details = match error {
                    LlmError::Http { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": SERVER_ERROR,
                        "details": redact_secrets(&details),
                    }),
                )
            }
        },
    }
}

/// Body for a panicking handler; registered with `CatchPanicLayer`
pub(crate) fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "handler panicked");

    ApiError::Internal("요청 처리 중 예기치 않은 오류가 발생했습니다.".to_string()).into_response()
}
