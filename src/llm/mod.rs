//! Upstream model clients.

pub mod agent;
pub mod openai;
pub mod types;

pub use agent::{AgentReply, AgentRequest, PersonalAgentClient};
pub use openai::OpenAiClient;
pub use types::{ChatCompletion, Message, Role};

use crate::retry::{Classify, RetryClass};

/// Errors from model backends
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected response format: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The endpoint or tool is not available for this account/API version;
    /// a plainer call may still work.
    pub fn is_unsupported(&self) -> bool {
        match self {
            LlmError::Http { status, message } => {
                matches!(status, 400 | 404)
                    || message.contains("responses")
                    || message.contains("web_search")
            }
            LlmError::InvalidResponse(_) => true,
            _ => false,
        }
    }
}

impl Classify for LlmError {
    fn retry_class(&self) -> RetryClass {
        match self {
            LlmError::Http { status, .. } if *status >= 500 && *status != 503 => {
                RetryClass::Server
            }
            LlmError::Network(e) => e.retry_class(),
            LlmError::Timeout => RetryClass::Network,
            _ => RetryClass::Fatal,
        }
    }
}

/// Pull `error.message` (or `message`) out of an upstream error body
pub(crate) fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .map(str::to_string)
}
