use crate::config::GoogleConfig;
use crate::directory::Directory;
use crate::model::{ImageOrigin, ImageRecord};
use crate::preview::domain_name;
use crate::retry::RetryPolicy;
use crate::search::{
    status_error, ImageSearchProvider, SearchError, SearchOptions, SearchProvider, SearchResult,
    SearchResults,
};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Custom Search JSON API returns at most this many items per request
const MAX_PAGE_SIZE: usize = 10;

/// Google Custom Search provider, used for both web and image search.
///
/// Requires an API key and a search engine id (`GOOGLE_API_KEY`,
/// `GOOGLE_SEARCH_ENGINE_ID`).
pub struct GoogleSearchProvider {
    client: Client,
    config: GoogleConfig,
    directory: Arc<Directory>,
    policy: RetryPolicy,
}

impl GoogleSearchProvider {
    pub fn new(config: GoogleConfig, directory: Arc<Directory>) -> Result<Self, reqwest::Error> {
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
        let key = self.config.api_key.as_deref().filter(|k| !k.is_empty());
        let cx = self.config.search_engine_id.as_deref().filter(|c| !c.is_empty());
        match (key, cx) {
            (Some(key), Some(cx)) => Ok((key, cx)),
            _ => Err(SearchError::NotConfigured),
        }
    }

    async fn query(&self, query: &str, count: usize, image: bool) -> Result<Value, SearchError> {
        let (key, cx) = self.credentials()?;
        let num = count.clamp(1, MAX_PAGE_SIZE).to_string();

        let mut params = vec![
            ("key", key),
            ("cx", cx),
            ("q", query),
            ("num", num.as_str()),
            ("safe", "active"),
        ];
        if image {
            params.push(("searchType", "image"));
        }

        tracing::debug!(query = %query, num = %num, image, "performing google search");

        self.policy
            .run("google", |_| {
                let request = self.client.get(&self.config.api_url).query(&params);
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        let error_text = response.text().await.unwrap_or_default();
                        tracing::warn!(
                            status = %status,
                            error = %error_text,
                            "google search api error"
                        );
                        return Err(status_error(status, error_text));
                    }
                    Ok(response.json::<Value>().await?)
                }
            })
            .await
    }
}

#[async_trait::async_trait]
impl SearchProvider for GoogleSearchProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResults, SearchError> {
        let json = self.query(query, options.max_results, false).await?;

        let mut items = Vec::new();
        for result in json["items"].as_array().into_iter().flatten() {
            let url = result["link"].as_str().unwrap_or_default();
            if url.is_empty() || !options.allows(url) {
                tracing::trace!(url = %url, "filtered out by domain rules");
                continue;
            }

            items.push(SearchResult {
                title: result["title"].as_str().unwrap_or_default().to_string(),
                url: url.to_string(),
                snippet: result["snippet"].as_str().unwrap_or_default().to_string(),
            });

            if items.len() >= options.max_results {
                break;
            }
        }

        tracing::debug!(query = %query, result_count = items.len(), "google search completed");

        Ok(SearchResults {
            items,
            // totalResults comes back as a decimal string
            total_results: json["searchInformation"]["totalResults"]
                .as_str()
                .and_then(|s| s.parse().ok()),
        })
    }
}

#[async_trait::async_trait]
impl ImageSearchProvider for GoogleSearchProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>, SearchError> {
        let json = self.query(query, options.max_results, true).await?;

        let images: Vec<ImageRecord> = json["items"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let url = item["link"].as_str().filter(|u| !u.is_empty())?;
                let image = &item["image"];
                let page = image["contextLink"].as_str().unwrap_or(url);
                if !options.allows(page) {
                    return None;
                }
                let title = item["title"].as_str().unwrap_or_default().to_string();
                let alt = item["snippet"]
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| title.clone());

                Some(ImageRecord {
                    url: url.to_string(),
                    title,
                    alt,
                    thumbnail: image["thumbnailLink"].as_str().map(str::to_string),
                    source: page.to_string(),
                    domain: domain_name(page, &self.directory.domains),
                    width: image["width"].as_u64().map(|w| w as u32),
                    height: image["height"].as_u64().map(|h| h as u32),
                    relevance_score: None,
                    method: ImageOrigin::Google,
                })
            })
            .take(options.max_results)
            .collect();

        tracing::debug!(query = %query, result_count = images.len(), "google image search completed");
        Ok(images)
    }
}
