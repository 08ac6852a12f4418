use crate::config::OpenAiConfig;
use crate::llm::types::{ChatCompletion, Message};
use crate::llm::{upstream_error_message, LlmError};
use crate::retry::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// OpenAI API client (chat completions + responses with web search)
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    policy: RetryPolicy,
}

/// Per-call generation settings
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
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

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_ok()
    }

    /// Settings for the plain chat endpoint
    pub fn chat_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.config.model.clone(),
            max_tokens: self.config.chat_max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Settings for web-search answers and their fallbacks
    pub fn search_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.config.search_model.clone(),
            max_tokens: self.config.search_max_tokens,
            temperature: self.config.temperature,
        }
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)
    }

    /// Create a (non-streaming) chat completion
    pub async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<ChatCompletion, LlmError> {
        tracing::debug!(
            model = %options.model,
            message_count = messages.len(),
            "openai chat request"
        );

        let body = ChatRequest {
            model: &options.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let value = self
            .post_json(&self.config.chat_url, &serde_json::to_value(&body).map_err(invalid)?)
            .await?;

        let response: ChatResponse = serde_json::from_value(value).map_err(invalid)?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))?;

        Ok(ChatCompletion {
            content,
            usage: response.usage,
            model: response.model.unwrap_or_else(|| options.model.clone()),
        })
    }

    /// Call the responses API with the web search tool enabled.
    ///
    /// The response envelope differs between API versions, so it is returned
    /// untyped for `parser::parse_upstream_response`.
    pub async fn respond_with_web_search(
        &self,
        input: &[Message],
        options: &GenerationOptions,
    ) -> Result<serde_json::Value, LlmError> {
        tracing::debug!(
            model = %options.model,
            message_count = input.len(),
            "openai responses request with web_search"
        );

        let body = json!({
            "model": options.model,
            "input": input,
            "tools": [{ "type": "web_search" }],
            "temperature": options.temperature,
            "max_output_tokens": options.max_tokens,
        });

        self.post_json(&self.config.responses_url, &body).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let api_key = self.api_key()?;

        self.policy
            .run("openai", |_| async move {
                let response = self
                    .client
                    .post(url)
                    .bearer_auth(api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(send_error)?;

                let status = response.status();
                if !status.is_success() {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    tracing::warn!(
                        status = %status,
                        error = %crate::logging::redact_secrets(&error_text),
                        "openai api returned error"
                    );

                    return Err(LlmError::Http {
                        status: status.as_u16(),
                        message: upstream_error_message(&error_text).unwrap_or(error_text),
                    });
                }

                response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| LlmError::InvalidResponse(e.to_string()))
            })
            .await
    }
}

pub(crate) fn send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(e)
    }
}

fn invalid(e: serde_json::Error) -> LlmError {
    LlmError::InvalidResponse(e.to_string())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(OpenAiConfig {
            chat_url: "http://127.0.0.1:9/unreachable".into(),
            ..OpenAiConfig::default()
        })
        .unwrap();

        assert!(!client.is_configured());
        let err = client
            .chat(&[Message::user("hi")], &client.chat_options())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn chat_request_serializes_messages_inline() {
        let messages = [Message::system("s"), Message::user("u")];
        let body = ChatRequest {
            model: "gpt-4.1",
            messages: &messages,
            max_tokens: 1000,
            temperature: 0.5,
            stream: false,
        };
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["messages"][1], json!({"role": "user", "content": "u"}));
        assert_eq!(value["stream"], json!(false));
    }
}
