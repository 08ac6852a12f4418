//! HTTP surface: router, shared state, error mapping.

mod error;
mod handlers;

pub use error::{ApiError, Backend};

use anyhow::{Context, Result};
use axum::http::{header, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::directory::Directory;
use crate::llm::{OpenAiClient, PersonalAgentClient};
use crate::orchestrator::Orchestrator;
use crate::retry::RetryPolicy;

/// Shared, read-only per-process state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<Directory>,
    pub openai: OpenAiClient,
    pub agent: PersonalAgentClient,
    pub orchestrator: Arc<Orchestrator>,
    /// Client for `/api/image-proxy`, optionally routed through an outbound proxy
    pub image_client: reqwest::Client,
    pub image_policy: RetryPolicy,
}

impl AppState {
    pub fn new(config: Config, directory: Directory) -> Result<Self> {
        let directory = Arc::new(directory);
        let openai =
            OpenAiClient::new(config.openai.clone()).context("Failed to build OpenAI client")?;
        let agent = PersonalAgentClient::new(config.personal_agent.clone())
            .context("Failed to build personal agent client")?;
        let orchestrator = Orchestrator::from_config(&config, directory.clone())
            .context("Failed to build search orchestrator")?;

        let mut image_client = reqwest::Client::builder()
            .user_agent(config.image_proxy.user_agent.as_str())
            .timeout(Duration::from_secs(config.image_proxy.timeout_secs));
        if let Some(proxy) = config
            .image_proxy
            .upstream_proxy
            .as_deref()
            .filter(|p| !p.is_empty())
        {
            let proxy = reqwest::Proxy::all(proxy)
                .with_context(|| format!("Invalid image proxy upstream: {proxy}"))?;
            image_client = image_client.proxy(proxy);
        }
        let image_client = image_client
            .build()
            .context("Failed to build image proxy client")?;

        let image_policy = RetryPolicy::new(config.image_proxy.max_attempts);

        Ok(Self {
            config: Arc::new(config),
            directory,
            openai,
            agent,
            orchestrator: Arc::new(orchestrator),
            image_client,
            image_policy,
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/api/openai-chat",
            post(handlers::chat::chat)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/openai-web-search",
            post(handlers::web_search::web_search)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/personal-agent-chat",
            post(handlers::agent::personal_agent_chat)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/image-proxy",
            get(handlers::image_proxy::image_proxy)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(CatchPanicLayer::custom(error::panic_response))
}

/// Bind `host:port` from config and serve until `shutdown` resolves
pub async fn serve<F>(config: Config, directory: Directory, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address: {}:{}",
                config.server.host, config.server.port
            )
        })?;

    tracing::info!(
        directory_version = %directory.version,
        directory_updated = %directory.updated,
        openai = config.openai.api_key.is_some(),
        personal_agent = config.personal_agent.api_key.is_some(),
        "starting krc-assistant"
    );

    let app = router(AppState::new(config, directory)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}
