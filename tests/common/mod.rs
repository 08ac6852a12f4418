//! Shared helpers: local mock upstreams and a spawned service under test.

#![allow(dead_code)]

use axum::Router;
use krc_assistant::config::Config;
use krc_assistant::directory::Directory;
use krc_assistant::server::{router, AppState};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Serve `app` on an ephemeral localhost port
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Like [`spawn`], for routers whose responses mention their own address
pub async fn spawn_with<F>(build: F) -> SocketAddr
where
    F: FnOnce(SocketAddr) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build(addr);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Config with no keys, fast backoff and no outbound defaults worth hitting
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.openai.max_attempts = 1;
    config.openai.timeout_secs = 5;
    config.preview.server_backoff_ms = 10;
    config.preview.network_backoff_ms = 10;
    config.preview.batch_delay_ms = 10;
    config.preview.timeout_ms = 2_000;
    config.preview.bulk_timeout_ms = 2_000;
    config.image_proxy.timeout_secs = 5;
    config.image_proxy.max_attempts = 1;
    config.personal_agent.max_attempts = 1;
    config
}

/// Config whose OpenAI endpoints point at a mock server
pub fn openai_config(mock: SocketAddr) -> Config {
    let mut config = test_config();
    config.openai.api_key = Some("sk-test-key-123456".to_string());
    config.openai.chat_url = format!("http://{mock}/v1/chat/completions");
    config.openai.responses_url = format!("http://{mock}/v1/responses");
    config
}

/// Start the service with `config` and the built-in directory; returns its base URL
pub async fn spawn_app(config: Config) -> String {
    let state = AppState::new(config, Directory::builtin().unwrap()).unwrap();
    let addr = spawn(router(state)).await;
    format!("http://{addr}")
}

/// Request counter shared with a mock handler
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicU32>);

impl Hits {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
