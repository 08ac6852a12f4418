mod common;

use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{openai_config, spawn, spawn_app, spawn_with, test_config};
use serde_json::{json, Value};

/// Mock OpenAI plus one article page. `responses` builds the responses-API
/// reply from the mock's own address.
async fn mock_upstream<F>(responses: F, chat: (StatusCode, Value)) -> std::net::SocketAddr
where
    F: Fn(std::net::SocketAddr) -> (StatusCode, Value) + Send + 'static,
{
    spawn_with(move |addr| {
        let (responses_status, responses_body) = responses(addr);
        let (chat_status, chat_body) = chat;
        Router::new()
            .route(
                "/v1/responses",
                post(move |Json(request): Json<Value>| {
                    let body = responses_body.clone();
                    async move {
                        assert_eq!(request["tools"][0]["type"], "web_search");
                        (responses_status, Json(body))
                    }
                }),
            )
            .route(
                "/v1/chat/completions",
                post(move || {
                    let body = chat_body.clone();
                    async move { (chat_status, Json(body)) }
                }),
            )
            .route(
                "/article",
                get(|| async {
                    Html(r#"<meta property="og:image" content="https://img.example.com/og.jpg">"#)
                }),
            )
    })
    .await
}

fn chat_ok(content: &str) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({ "choices": [{ "message": { "content": content } }], "usage": { "total_tokens": 7 } }),
    )
}

async fn post_search(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/api/openai-web-search"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn citations_become_sources_images_and_references() {
    let mock = mock_upstream(
        |addr| {
            (
                StatusCode::OK,
                json!({
                    "output": [
                        { "type": "web_search_call", "status": "completed" },
                        { "type": "message", "content": [{
                            "type": "output_text",
                            "text": "저수지 현황에 대한 답변입니다.",
                            "annotations": [{
                                "type": "url_citation",
                                "url": format!("http://{addr}/article"),
                                "title": "저수지 기사"
                            }]
                        }]}
                    ],
                    "usage": { "total_tokens": 120 }
                }),
            )
        },
        chat_ok("unused"),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "저수지 현황" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["searchPerformed"], true);
    assert_eq!(body["realSources"], 1);
    assert_eq!(body["sources"][0]["title"], "저수지 기사");
    assert_eq!(body["sources"][0]["snippet"], "저수지 현황 관련 검색 결과");

    let response = body["response"].as_str().unwrap();
    assert!(response.starts_with("저수지 현황에 대한 답변입니다."));
    assert!(response.contains("참고 자료"));
    assert!(response.contains("[저수지 기사]"));

    let images = body["images"].as_array().unwrap();
    assert_eq!(images[0]["url"], "https://img.example.com/og.jpg");
    assert_eq!(images[0]["method"], "og:image");
    assert_eq!(body["realImages"], 1);
    assert_eq!(images.len(), 3);
    assert_eq!(images[2]["method"], "placeholder");

    assert_eq!(body["usage"]["total_tokens"], 120);
    assert_eq!(body["debug"]["parsingMethod"], "output_items");
    assert_eq!(body["debug"]["personQuery"], false);
}

#[tokio::test]
async fn unsupported_responses_api_falls_back_to_chat() {
    let mock = mock_upstream(
        |_| {
            (
                StatusCode::NOT_FOUND,
                json!({ "error": { "message": "Unknown endpoint /v1/responses" } }),
            )
        },
        chat_ok("기본 GPT 답변입니다."),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "농지은행" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["searchPerformed"], false);
    assert!(body["note"].as_str().unwrap().contains("Responses API"));
    assert!(body["response"].as_str().unwrap().starts_with("기본 GPT 답변입니다."));
}

#[tokio::test]
async fn total_failure_returns_degraded_answer() {
    let mock = mock_upstream(
        |_| (StatusCode::NOT_FOUND, json!({ "error": { "message": "gone" } })),
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": { "message": "down" } })),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "농지은행" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "모든 API 호출이 실패했습니다.");
    assert!(body["response"].as_str().unwrap().contains("1577-7770"));
    assert!(!body["sources"].as_array().unwrap().is_empty());
    assert_eq!(body["images"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_without_text_uses_template() {
    let mock = mock_upstream(
        |_| {
            (
                StatusCode::OK,
                json!({ "output": [{ "type": "web_search_call", "status": "completed" }] }),
            )
        },
        chat_ok("unused"),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "가뭄" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("웹 검색을 수행했지만"));
    // nothing was cited, so directory sources fill in
    assert_eq!(body["realSources"], 0);
    assert!(!body["sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_answer_without_search_asks_chat() {
    let mock = mock_upstream(
        |_| (StatusCode::OK, json!({ "output": [] })),
        chat_ok("채팅 대체 답변"),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (_, body) = post_search(&base, json!({ "query": "가뭄" })).await;
    assert!(body["response"].as_str().unwrap().starts_with("채팅 대체 답변"));
    assert_eq!(body["searchPerformed"], false);
}

#[tokio::test]
async fn person_query_prepends_directory_record() {
    let mock = mock_upstream(
        |_| (StatusCode::OK, json!({ "output_text": "공사 경영진에 대한 일반적인 답변입니다." })),
        chat_ok("unused"),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "한국농어촌공사 사장은 누구인가요?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["debug"]["personQuery"], true);
    assert_eq!(body["sources"][0]["prioritized"], true);

    let response = body["response"].as_str().unwrap();
    assert!(response.starts_with("한국농어촌공사의 사장은(는) **이병호**입니다."));
    assert!(response.contains("⭐"));
}

/// Naver and Google image search returning one overlapping URL
async fn mock_image_search() -> std::net::SocketAddr {
    spawn(
        Router::new()
            .route(
                "/v1/search/image",
                get(|| async {
                    Json(json!({ "items": [
                        { "title": "<b>이병호</b> 한국농어촌공사 사장", "link": "https://img.example.com/n1.jpg",
                          "sizewidth": "640", "sizeheight": "480" },
                        { "title": "한국농어촌공사 전경", "link": "https://img.example.com/shared.jpg" }
                    ]}))
                }),
            )
            .route(
                "/customsearch/v1",
                get(|axum::extract::RawQuery(query): axum::extract::RawQuery| async move {
                    if query.unwrap_or_default().contains("searchType=image") {
                        Json(json!({ "items": [
                            { "title": "한국농어촌공사 본사", "link": "https://img.example.com/shared.jpg" },
                            { "title": "이병호 사장 취임식", "link": "https://img.example.com/g2.jpg" },
                            { "title": "농촌 풍경", "link": "https://img.example.com/g3.jpg" }
                        ]}))
                    } else {
                        Json(json!({ "items": [] }))
                    }
                }),
            ),
    )
    .await
}

#[tokio::test]
async fn person_query_ranks_naver_then_google_images() {
    let mock = mock_upstream(
        |_| (StatusCode::OK, json!({ "output_text": "이병호 사장이 공사를 이끌고 있습니다." })),
        chat_ok("unused"),
    )
    .await;
    let search = mock_image_search().await;
    let mut config = openai_config(mock);
    config.naver.client_id = Some("n-id".to_string());
    config.naver.client_secret = Some("n-secret".to_string());
    config.naver.api_url = format!("http://{search}/v1/search/image");
    config.google.api_key = Some("g-key".to_string());
    config.google.search_engine_id = Some("g-cx".to_string());
    config.google.api_url = format!("http://{search}/customsearch/v1");
    let base = spawn_app(config).await;

    let (status, body) = post_search(&base, json!({ "query": "한국농어촌공사 사장은 누구인가요?" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["debug"]["personQuery"], true);
    assert_eq!(body["debug"]["imageExtractionMethod"], "hybrid-search+og-image");

    let images = body["images"].as_array().unwrap();
    let urls: Vec<&str> = images.iter().map(|i| i["url"].as_str().unwrap()).collect();
    assert_eq!(
        urls,
        [
            "https://img.example.com/n1.jpg",
            "https://img.example.com/g2.jpg",
            "https://img.example.com/shared.jpg",
            "https://img.example.com/g3.jpg",
        ]
    );
    assert_eq!(images[0]["method"], "naver");
    assert_eq!(images[0]["width"], 640);
    // the overlapping URL keeps its Naver copy
    assert_eq!(images[2]["method"], "naver");
    assert_eq!(images[1]["method"], "google");

    let scores: Vec<u64> = images
        .iter()
        .map(|i| i["relevanceScore"].as_u64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores: {scores:?}");
    assert_eq!(scores[0], 180);
    assert_eq!(body["realImages"], 4);
}

#[tokio::test]
async fn upstream_quota_error_is_surfaced() {
    let mock = mock_upstream(
        |_| (StatusCode::TOO_MANY_REQUESTS, json!({ "error": { "message": "quota" } })),
        chat_ok("unused"),
    )
    .await;
    let base = spawn_app(openai_config(mock)).await;

    let (status, body) = post_search(&base, json!({ "query": "가뭄" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_query_is_bad_request() {
    let base = spawn_app(test_config()).await;
    let (status, body) = post_search(&base, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "검색 쿼리가 필요합니다.");
}
