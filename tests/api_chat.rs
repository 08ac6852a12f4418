mod common;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{openai_config, spawn, spawn_app, test_config};
use serde_json::{json, Value};

async fn mock_openai(status: StatusCode, body: Value) -> std::net::SocketAddr {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(request): Json<Value>| {
            let body = body.clone();
            async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-test-key-123456")
                );
                assert_eq!(request["messages"][0]["role"], "system");
                assert_eq!(request["stream"], false);
                (status, Json(body))
            }
        }),
    );
    spawn(app).await
}

async fn post_chat(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/api/openai-chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn chat_returns_completion() {
    let mock = mock_openai(
        StatusCode::OK,
        json!({
            "model": "gpt-4.1-2025",
            "choices": [{ "message": { "role": "assistant", "content": "안녕하세요! 무엇을 도와드릴까요?" } }],
            "usage": { "total_tokens": 42 }
        }),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_chat(
        &base,
        json!({
            "message": "안녕",
            "conversationHistory": [{ "role": "user", "content": "이전 질문" }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(!body["response"].as_str().unwrap().is_empty());
    assert_eq!(body["usage"]["total_tokens"], 42);
    assert_eq!(body["model"], "gpt-4.1");
}

#[tokio::test]
async fn missing_key_returns_500_with_debug() {
    let base = spawn_app(test_config()).await;

    let (status, body) = post_chat(&base, json!({ "message": "안녕" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["debug"].as_str().unwrap().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn missing_message_is_bad_request() {
    let base = spawn_app(test_config()).await;

    let (status, body) = post_chat(&base, json!({ "conversationHistory": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "메시지가 필요합니다.");

    let (status, _) = post_chat(&base, json!({ "message": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let base = spawn_app(test_config()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/openai-chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "잘못된 JSON 형식입니다.");
}

#[tokio::test]
async fn options_and_wrong_method() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/api/openai-chat");

    let response = client
        .request(reqwest::Method::OPTIONS, &url)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let base = spawn_app(test_config()).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{base}/api/openai-chat"))
        .header("origin", "https://chat.example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn upstream_rate_limit_maps_to_429() {
    let mock = mock_openai(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "Rate limit reached" } }),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_chat(&base, json!({ "message": "안녕" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn upstream_auth_failure_maps_to_500() {
    let mock = mock_openai(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_chat(&base, json!({ "message": "안녕" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "OpenAI API 키가 유효하지 않습니다.");
}

#[tokio::test]
async fn health_route() {
    let base = spawn_app(test_config()).await;
    let response = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}
