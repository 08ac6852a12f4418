use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use crate::retry::{Classify, RetryClass, RetryPolicy};
use crate::server::{ApiError, AppState};

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const URL_REQUIRED: &str = "URL parameter required";

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    #[serde(default)]
    url: Option<String>,
}

/// Mixed-content pages can only embed https images
pub fn upgrade_to_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Failure of the upstream GET, before any body bytes are read
#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("image host returned {0}")]
    Status(StatusCode),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl Classify for FetchError {
    fn retry_class(&self) -> RetryClass {
        match self {
            FetchError::Status(status) if status.is_server_error() => RetryClass::Server,
            FetchError::Status(_) => RetryClass::Fatal,
            FetchError::Transport(e) => e.retry_class(),
        }
    }
}

/// `GET /api/image-proxy?url=...`
pub async fn image_proxy(
    State(state): State<AppState>,
    query: Result<Query<ProxyParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected query string");
        ApiError::BadRequest(URL_REQUIRED.to_string())
    })?;
    let url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest(URL_REQUIRED.to_string()))?;
    let target = upgrade_to_https(url);

    tracing::debug!(url = %target, "proxying image");

    let upstream = fetch_image(
        &state.image_client,
        &state.image_policy,
        &target,
        &state.config.image_proxy.referer,
    )
    .await?;

    image_response(upstream, state.config.image_proxy.cache_max_age_secs).await
}

/// GET the image, retrying transport failures and 5xx answers.
///
/// Other statuses are returned as-is for `image_response` to pass through.
async fn fetch_image(
    client: &reqwest::Client,
    policy: &RetryPolicy,
    url: &str,
    referer: &str,
) -> Result<reqwest::Response, ApiError> {
    let result = policy
        .run("image_proxy", |_| {
            let request = client
                .get(url)
                .header(header::REFERER, referer)
                .header(header::ACCEPT, IMAGE_ACCEPT);
            async move {
                let response = request.send().await?;
                let status = response.status();
                if status.is_server_error() {
                    return Err(FetchError::Status(status));
                }
                Ok(response)
            }
        })
        .await;

    match result {
        Ok(response) => Ok(response),
        Err(FetchError::Status(status)) => {
            tracing::warn!(url = %url, status = %status, "image host returned error");
            Err(ApiError::ImageFetch(status))
        }
        Err(FetchError::Transport(e)) => {
            tracing::warn!(url = %url, error = %e, "image fetch failed");
            Err(ApiError::Proxy(e.to_string()))
        }
    }
}

/// Stream an upstream image back, or pass its error status through
async fn image_response(
    upstream: reqwest::Response,
    cache_max_age_secs: u64,
) -> Result<Response, ApiError> {
    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!(url = %upstream.url(), status = %status, "image host returned error");
        return Err(ApiError::ImageFetch(
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        ));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={cache_max_age_secs}"),
        )
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
