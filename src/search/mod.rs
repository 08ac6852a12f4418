pub mod hybrid;
pub mod providers;
pub mod ranking;

pub use hybrid::HybridImageSearch;
pub use ranking::{relevance_score, RelevanceContext, ScoringWeights};

use crate::model::ImageRecord;
use crate::retry::{Classify, RetryClass};
use anyhow::Result;

/// Web search provider abstraction - different providers can be plugged in
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Perform a search query with given options
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults, SearchError>;
}

/// Image search provider; results are already normalized to `ImageRecord`
#[async_trait::async_trait]
pub trait ImageSearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search_images(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<ImageRecord>, SearchError>;
}

/// Search options for filtering and controlling results
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results to return (default: 10)
    pub max_results: usize,
    /// Only include results from these domains (empty = no filter)
    pub allowed_domains: Vec<String>,
    /// Exclude results from these domains
    pub blocked_domains: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
        }
    }
}

impl SearchOptions {
    /// Check if URL matches domain filtering rules
    pub fn allows(&self, url: &str) -> bool {
        // White list filtering (if specified, only these domains are allowed)
        if !self.allowed_domains.is_empty()
            && !self.allowed_domains.iter().any(|domain| url.contains(domain))
        {
            return false;
        }

        // Blacklist filtering (exclude these domains)
        !self.blocked_domains.iter().any(|domain| url.contains(domain))
    }
}

/// Search results container
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Individual search result items
    pub items: Vec<SearchResult>,
    /// Total number of results available (if provided by the search engine)
    pub total_results: Option<u64>,
}

/// Individual search result
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Page title
    pub title: String,
    /// Page URL
    pub url: String,
    /// Snippet/description of the page content
    pub snippet: String,
}

/// Search-related errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Provider not configured")]
    NotConfigured,
}

impl Classify for SearchError {
    fn retry_class(&self) -> RetryClass {
        match self {
            SearchError::ApiError { status, .. } if *status >= 500 => RetryClass::Server,
            SearchError::NetworkError(e) => e.retry_class(),
            _ => RetryClass::Fatal,
        }
    }
}

/// Map a non-success status to a `SearchError`
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> SearchError {
    match status.as_u16() {
        401 | 403 => SearchError::InvalidApiKey,
        429 => SearchError::RateLimitExceeded,
        code => SearchError::ApiError {
            status: code,
            message: body,
        },
    }
}
