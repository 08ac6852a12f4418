mod common;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{spawn, spawn_app, test_config, Hits};
use krc_assistant::config::PersonalAgentConfig;
use krc_assistant::llm::{AgentRequest, LlmError, PersonalAgentClient};
use krc_assistant::retry::RetryPolicy;
use serde_json::{json, Value};
use std::time::Duration;

async fn mock_agent(status: StatusCode, body: Value) -> std::net::SocketAddr {
    spawn(Router::new().route(
        "/v1/chat-messages",
        post(move |headers: HeaderMap, Json(request): Json<Value>| {
            let body = body.clone();
            async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer app-key")
                );
                assert_eq!(request["response_mode"], "blocking");
                assert_eq!(request["auto_generate_name"], false);
                assert_eq!(request["inputs"], json!({}));
                if request["conversation_id"] == "" {
                    assert_eq!(request["user"], "default_user");
                } else {
                    assert_eq!(request["user"], "u-1");
                }
                (status, Json(body))
            }
        }),
    ))
    .await
}

async fn app_for(mock: std::net::SocketAddr) -> String {
    let mut config = test_config();
    config.personal_agent.api_key = Some("app-key".to_string());
    config.personal_agent.api_url = format!("http://{mock}/v1/");
    spawn_app(config).await
}

async fn post_agent(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/api/personal-agent-chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn forwards_message_and_normalizes_reply() {
    let mock = mock_agent(
        StatusCode::OK,
        json!({
            "answer": "에이전트 답변",
            "conversation_id": "conv-1",
            "message_id": "msg-1",
            "metadata": { "usage": { "total_tokens": 5 } },
            "created_at": 1700000000
        }),
    )
    .await;
    let base = app_for(mock).await;

    let (status, body) = post_agent(&base, json!({ "message": "안녕" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "에이전트 답변");
    assert_eq!(body["conversation_id"], "conv-1");
    assert_eq!(body["message_id"], "msg-1");
    assert_eq!(body["mode"], "chat");
    assert_eq!(body["created_at"], 1700000000);
}

#[tokio::test]
async fn known_error_codes_become_messages() {
    let mock = mock_agent(
        StatusCode::BAD_REQUEST,
        json!({ "code": "provider_quota_exceeded", "message": "quota" }),
    )
    .await;
    let base = app_for(mock).await;

    let (status, body) = post_agent(
        &base,
        json!({ "message": "안녕", "conversationId": "c-9", "userId": "u-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "모델 사용량을 초과했습니다.");
}

#[tokio::test]
async fn missing_key_and_missing_message() {
    let base = spawn_app(test_config()).await;

    let (status, body) = post_agent(&base, json!({ "message": "안녕" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["debug"].as_str().unwrap().contains("PERSONAL_AGENT_API_KEY"));

    let (status, body) = post_agent(&base, json!({ "userId": "u" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "메시지가 필요합니다.");
}

/// Answers 502 `failures` times, then a normal reply
async fn flaky_agent(failures: u32, hits: Hits) -> std::net::SocketAddr {
    spawn(Router::new().route(
        "/v1/chat-messages",
        post(move || {
            let hits = hits.clone();
            async move {
                hits.hit();
                if hits.count() <= failures {
                    (StatusCode::BAD_GATEWAY, Json(json!({ "message": "bad gateway" })))
                } else {
                    (StatusCode::OK, Json(json!({ "answer": "재시도 후 답변" })))
                }
            }
        }),
    ))
    .await
}

fn agent_client(mock: std::net::SocketAddr, max_attempts: u32) -> PersonalAgentClient {
    PersonalAgentClient::new(PersonalAgentConfig {
        api_key: Some("app-key".to_string()),
        api_url: format!("http://{mock}/v1"),
        ..PersonalAgentConfig::default()
    })
    .unwrap()
    .with_retry_policy(
        RetryPolicy::new(max_attempts)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(10)),
    )
}

fn request() -> AgentRequest {
    AgentRequest {
        message: "안녕".to_string(),
        conversation_id: String::new(),
        user_id: "default_user".to_string(),
        files: Vec::new(),
    }
}

#[tokio::test]
async fn transient_upstream_error_is_retried() {
    let hits = Hits::default();
    let mock = flaky_agent(1, hits.clone()).await;

    let reply = agent_client(mock, 3).send(&request()).await.unwrap();

    assert_eq!(reply.response, "재시도 후 답변");
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn retries_stop_at_max_attempts() {
    let hits = Hits::default();
    let mock = flaky_agent(u32::MAX, hits.clone()).await;

    let err = agent_client(mock, 2).send(&request()).await.unwrap_err();

    assert!(matches!(err, LlmError::Http { status: 502, .. }));
    assert_eq!(hits.count(), 2);
}
