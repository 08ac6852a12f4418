use crate::config::NaverConfig;
use crate::directory::Directory;
use crate::model::{ImageOrigin, ImageRecord};
use crate::preview::domain_name;
use crate::retry::RetryPolicy;
use crate::search::providers::strip_tags;
use crate::search::{status_error, ImageSearchProvider, SearchError, SearchOptions};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Naver image search accepts `display` between 10 and 100
const MIN_DISPLAY: usize = 10;
const MAX_DISPLAY: usize = 100;

/// Naver Open API image search
pub struct NaverImageProvider {
    client: Client,
    config: NaverConfig,
    directory: Arc<Directory>,
    policy: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct NaverImageResponse {
    #[serde(default)]
    items: Vec<NaverImageItem>,
}

/// Sizes come back as decimal strings
#[derive(Debug, Deserialize)]
struct NaverImageItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    sizeheight: Option<String>,
    #[serde(default)]
    sizewidth: Option<String>,
}

impl NaverImageProvider {
    pub fn new(config: NaverConfig, directory: Arc<Directory>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            directory,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<(&str, &str), SearchError> {
        let id = self.config.client_id.as_deref().filter(|v| !v.is_empty());
        let secret = self.config.client_secret.as_deref().filter(|v| !v.is_empty());
        match (id, secret) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(SearchError::NotConfigured),
        }
    }

    fn to_record(&self, item: NaverImageItem) -> ImageRecord {
        let title = strip_tags(&item.title);
        ImageRecord {
            domain: domain_name(&item.link, &self.directory.domains),
            source: item.link.clone(),
            url: item.link,
            alt: title.clone(),
            title,
            thumbnail: item.thumbnail.filter(|t| !t.is_empty()),
            width: item.sizewidth.and_then(|w| w.trim().parse().ok()),
            height: item.sizeheight.and_then(|h| h.trim().parse().ok()),
            relevance_score: None,
            method: ImageOrigin::Naver,
        }
    }
}

#[async_trait::async_trait]
impl ImageSearchProvider for NaverImageProvider {
    fn name(&self) -> &str {
        "naver"
    }

    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>, SearchError> {
        let (id, secret) = self.credentials()?;
        let display_param = options.max_results.clamp(MIN_DISPLAY, MAX_DISPLAY).to_string();

        tracing::debug!(query = %query, display = %display_param, "performing naver image search");

        let data: NaverImageResponse = self
            .policy
            .run("naver", |_| {
                let request = self
                    .client
                    .get(&self.config.api_url)
                    .header("X-Naver-Client-Id", id)
                    .header("X-Naver-Client-Secret", secret)
                    .query(&[
                        ("query", query),
                        ("display", display_param.as_str()),
                        ("sort", "sim"),
                        ("filter", "large"),
                    ]);
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        let error_text = response.text().await.unwrap_or_default();
                        tracing::warn!(
                            status = %status,
                            error = %error_text,
                            "naver image search api error"
                        );
                        return Err(status_error(status, error_text));
                    }
                    Ok(response.json::<NaverImageResponse>().await?)
                }
            })
            .await?;

        let images: Vec<ImageRecord> = data
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty() && options.allows(&item.link))
            .map(|item| self.to_record(item))
            .take(options.max_results)
            .collect();

        tracing::debug!(query = %query, result_count = images.len(), "naver image search completed");
        Ok(images)
    }
}
