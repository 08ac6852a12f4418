use futures::future::join_all;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::config::PreviewConfig;
use crate::directory::Directory;
use crate::model::{ImageOrigin, ImageRecord, SourceRecord};
use crate::preview::domain::domain_name;
use crate::retry::{Classify, RetryClass, RetryPolicy};

const DEFAULT_IMAGE_TITLE: &str = "OG 이미지";

/// Meta tags checked in order; the first capture wins.
static META_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // og:image, property before content
        r#"(?i)<meta\s+(?:[^>]*?\s)?property\s*=\s*["']og:image["'][^>]*?\scontent\s*=\s*["']([^"']+)["']"#,
        // og:image, content before property
        r#"(?i)<meta\s+(?:[^>]*?\s)?content\s*=\s*["']([^"']+)["'][^>]*?\sproperty\s*=\s*["']og:image["']"#,
        // twitter card
        r#"(?i)<meta\s+(?:[^>]*?\s)?(?:name|property)\s*=\s*["']twitter:image["'][^>]*?\scontent\s*=\s*["']([^"']+)["']"#,
        r#"(?i)<meta\s+(?:[^>]*?\s)?content\s*=\s*["']([^"']+)["'][^>]*?\s(?:name|property)\s*=\s*["']twitter:image["']"#,
        // generic image meta
        r#"(?i)<meta\s+(?:[^>]*?\s)?name\s*=\s*["']image["'][^>]*?\scontent\s*=\s*["']([^"']+)["']"#,
        // og:image:url variant
        r#"(?i)<meta\s+(?:[^>]*?\s)?property\s*=\s*["']og:image:url["'][^>]*?\scontent\s*=\s*["']([^"']+)["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid meta regex"))
    .collect()
});

/// Per-call fetch settings
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub timeout: Duration,
    /// Total attempts, the first request included
    pub retries: u32,
    pub user_agent: String,
    pub follow_redirects: bool,
}

impl PreviewOptions {
    /// Settings for a single, user-visible lookup
    pub fn single(config: &PreviewConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            retries: config.retries,
            user_agent: config.user_agent.clone(),
            follow_redirects: config.follow_redirects,
        }
    }

    /// Settings used for every page of a bulk scrape
    pub fn bulk(config: &PreviewConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.bulk_timeout_ms),
            retries: config.bulk_retries,
            ..Self::single(config)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Classify for PreviewError {
    fn retry_class(&self) -> RetryClass {
        match self {
            PreviewError::Status(403 | 404 | 410) => RetryClass::Fatal,
            PreviewError::Status(status) if *status >= 500 => RetryClass::Server,
            PreviewError::Status(_) => RetryClass::Fatal,
            PreviewError::Timeout(_) => RetryClass::Network,
            PreviewError::Network(e) if e.is_connect() || e.is_timeout() => RetryClass::Network,
            PreviewError::Network(_) => RetryClass::Fatal,
        }
    }
}

/// Scrapes preview images (og:image and friends) from source pages
pub struct PreviewExtractor {
    client: reqwest::Client,
    no_redirect_client: reqwest::Client,
    directory: Arc<Directory>,
    single: PreviewOptions,
    bulk: PreviewOptions,
    server_backoff: Duration,
    network_backoff: Duration,
    batch_delay: Duration,
}

impl PreviewExtractor {
    pub fn new(config: &PreviewConfig, directory: Arc<Directory>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .redirect(Policy::limited(10))
                .build()?,
            no_redirect_client: reqwest::Client::builder().redirect(Policy::none()).build()?,
            directory,
            single: PreviewOptions::single(config),
            bulk: PreviewOptions::bulk(config),
            server_backoff: Duration::from_millis(config.server_backoff_ms),
            network_backoff: Duration::from_millis(config.network_backoff_ms),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        })
    }

    pub fn single_options(&self) -> &PreviewOptions {
        &self.single
    }

    pub fn bulk_options(&self) -> &PreviewOptions {
        &self.bulk
    }

    /// Fetch `url` and return its preview image, or `None` on any failure.
    ///
    /// 403/404/410 are final. 5xx, timeouts and connection errors are retried
    /// with linear backoff until `options.retries` attempts have been made.
    pub async fn extract_preview_image(
        &self,
        url: &str,
        options: &PreviewOptions,
    ) -> Option<ImageRecord> {
        let policy = RetryPolicy::new(options.retries)
            .with_backoff(self.server_backoff, self.network_backoff);

        tracing::debug!(url = %url, retries = options.retries, "extracting preview image");

        let html = match policy
            .run("preview", |attempt| self.fetch_html(url, options, attempt))
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "preview fetch failed");
                return None;
            }
        };

        let Some(image_url) = find_preview_image(&html, url) else {
            tracing::debug!(url = %url, html_len = html.len(), "no preview image meta tag");
            return None;
        };

        tracing::debug!(url = %url, image = %image_url, "preview image found");

        Some(ImageRecord {
            url: image_url,
            title: DEFAULT_IMAGE_TITLE.to_string(),
            alt: DEFAULT_IMAGE_TITLE.to_string(),
            thumbnail: None,
            source: url.to_string(),
            domain: domain_name(url, &self.directory.domains),
            width: None,
            height: None,
            relevance_score: None,
            method: ImageOrigin::OgImage,
        })
    }

    /// Scrape every source in batches of `max_concurrent`, pausing between
    /// batches. Failures are dropped; successes keep source order.
    pub async fn extract_preview_images_from_sources(
        &self,
        sources: &[SourceRecord],
        max_concurrent: usize,
    ) -> Vec<ImageRecord> {
        if sources.is_empty() {
            return Vec::new();
        }

        let batch_size = max_concurrent.max(1);
        let batch_count = sources.len().div_ceil(batch_size);
        let mut images = Vec::new();

        for (index, batch) in sources.chunks(batch_size).enumerate() {
            tracing::debug!(batch = index + 1, size = batch.len(), "preview batch");

            let results = join_all(batch.iter().map(|source| self.preview_for_source(source))).await;
            images.extend(results.into_iter().flatten());

            if index + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        tracing::info!(
            sources = sources.len(),
            images = images.len(),
            "preview extraction complete"
        );
        images
    }

    async fn preview_for_source(&self, source: &SourceRecord) -> Option<ImageRecord> {
        if source.url.trim().is_empty() {
            tracing::warn!(title = %source.title, "skipping source without url");
            return None;
        }

        let mut image = self.extract_preview_image(&source.url, &self.bulk).await?;
        if !source.title.is_empty() {
            image.title = source.title.clone();
        }
        image.alt = [&source.snippet, &source.title]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_IMAGE_TITLE.to_string());
        Some(image)
    }

    async fn fetch_html(
        &self,
        url: &str,
        options: &PreviewOptions,
        attempt: u32,
    ) -> Result<String, PreviewError> {
        let client = if options.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        tracing::trace!(url = %url, attempt, "preview fetch");

        let request = client
            .get(url)
            .header(USER_AGENT, &options.user_agent)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en;q=0.8")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1");

        let fetch = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(PreviewError::Status(status.as_u16()));
            }
            Ok::<String, PreviewError>(response.text().await?)
        };

        match tokio::time::timeout(options.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(PreviewError::Timeout(options.timeout)),
        }
    }
}

/// First preview-image URL declared in `html`, made absolute against `page_url`
pub fn find_preview_image(html: &str, page_url: &str) -> Option<String> {
    META_PATTERNS.iter().find_map(|re| {
        let raw = re.captures(html)?.get(1)?.as_str().trim();
        if raw.is_empty() {
            return None;
        }
        resolve_image_url(&raw.replace("&amp;", "&"), page_url)
    })
}

/// Turn protocol-relative and relative image references into absolute URLs
pub fn resolve_image_url(raw: &str, page_url: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("//") {
        let scheme = url::Url::parse(page_url)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return Some(format!("{scheme}:{raw}"));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    let base = url::Url::parse(page_url).ok()?;
    base.join(raw).ok().map(|u| u.to_string())
}
