use crate::config::PersonalAgentConfig;
use crate::llm::openai::send_error;
use crate::llm::LlmError;
use crate::retry::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NO_ANSWER: &str = "응답을 받지 못했습니다.";

/// Client for the secondary conversational-agent backend (`/chat-messages`)
#[derive(Clone)]
pub struct PersonalAgentClient {
    client: Client,
    config: PersonalAgentConfig,
    policy: RetryPolicy,
}

/// One user turn sent to the agent
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub message: String,
    /// Empty string starts a new conversation
    pub conversation_id: String,
    pub user_id: String,
    pub files: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessagesBody<'a> {
    query: &'a str,
    inputs: serde_json::Map<String, serde_json::Value>,
    response_mode: &'static str,
    user: &'a str,
    conversation_id: &'a str,
    files: &'a [serde_json::Value],
    auto_generate_name: bool,
}

#[derive(Debug, Deserialize)]
struct ChatMessagesResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    created_at: Option<serde_json::Value>,
}

/// Normalized agent answer
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub mode: String,
    pub created_at: Option<serde_json::Value>,
}

impl PersonalAgentClient {
    pub fn new(config: PersonalAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let policy = RetryPolicy::new(config.max_attempts);
        Ok(Self {
            client,
            config,
            policy,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat-messages", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn send(&self, request: &AgentRequest) -> Result<AgentReply, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let endpoint = self.endpoint();
        tracing::debug!(
            endpoint = %endpoint,
            user = %request.user_id,
            has_conversation = !request.conversation_id.is_empty(),
            files = request.files.len(),
            "personal agent request"
        );

        let body = ChatMessagesBody {
            query: &request.message,
            inputs: serde_json::Map::new(),
            response_mode: "blocking",
            user: &request.user_id,
            conversation_id: &request.conversation_id,
            files: &request.files,
            auto_generate_name: false,
        };

        let endpoint = endpoint.as_str();
        let body = &body;
        let data = self
            .policy
            .run("personal_agent", |_| async move {
                let response = self
                    .client
                    .post(endpoint)
                    .bearer_auth(api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(send_error)?;

                let status = response.status();
                if !status.is_success() {
                    let error_text = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        status = %status,
                        error = %crate::logging::redact_secrets(&error_text),
                        "personal agent api returned error"
                    );
                    return Err(LlmError::Http {
                        status: status.as_u16(),
                        message: agent_error_message(status.as_u16(), &error_text),
                    });
                }

                response
                    .json::<ChatMessagesResponse>()
                    .await
                    .map_err(|e| LlmError::InvalidResponse(e.to_string()))
            })
            .await?;

        let reply = AgentReply {
            response: data
                .answer
                .or(data.message)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_ANSWER.to_string()),
            conversation_id: data
                .conversation_id
                .unwrap_or_else(|| request.conversation_id.clone()),
            message_id: data.message_id,
            metadata: data.metadata,
            mode: data.mode.unwrap_or_else(|| "chat".to_string()),
            created_at: data.created_at,
        };

        tracing::debug!(
            conversation_id = %reply.conversation_id,
            response_len = reply.response.len(),
            "personal agent reply"
        );
        Ok(reply)
    }
}

/// User-facing message for an agent error response
pub fn agent_error_message(status: u16, body: &str) -> String {
    const DEFAULT: &str = "개인 AI Agent API 오류가 발생했습니다.";

    let Ok(data) = serde_json::from_str::<serde_json::Value>(body) else {
        return DEFAULT.to_string();
    };

    match status {
        400 => match data["code"].as_str() {
            Some("invalid_param") => "잘못된 입력값입니다.",
            Some("app_unavailable") => "앱 설정에 문제가 있습니다.",
            Some("provider_not_initialize") => "사용 가능한 AI 모델이 없습니다.",
            Some("provider_quota_exceeded") => "모델 사용량을 초과했습니다.",
            Some("model_currently_not_support") => "현재 사용할 수 없는 모델입니다.",
            Some("workflow_request_error") => "커스텀 에이전트 오류가 발생했습니다.",
            _ => DEFAULT,
        }
        .to_string(),
        500 => "서버 내부 오류가 발생했습니다.".to_string(),
        _ => data["message"].as_str().unwrap_or(DEFAULT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_error_codes() {
        assert_eq!(
            agent_error_message(400, r#"{"code":"provider_quota_exceeded"}"#),
            "모델 사용량을 초과했습니다."
        );
        assert_eq!(
            agent_error_message(500, r#"{"code":"x"}"#),
            "서버 내부 오류가 발생했습니다."
        );
        assert_eq!(
            agent_error_message(404, r#"{"message":"Conversation Not Exists."}"#),
            "Conversation Not Exists."
        );
        assert_eq!(
            agent_error_message(400, "not json"),
            "개인 AI Agent API 오류가 발생했습니다."
        );
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = PersonalAgentClient::new(PersonalAgentConfig {
            api_url: "http://agent.local/v1/".into(),
            ..PersonalAgentConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://agent.local/v1/chat-messages");
        assert!(!client.is_configured());
    }
}
