use serde::{Deserialize, Serialize};

use crate::search::ranking::ScoringWeights;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub personal_agent: PersonalAgentConfig,
    pub google: GoogleConfig,
    pub naver: NaverConfig,
    pub preview: PreviewConfig,
    pub image_proxy: ImageProxyConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,

    /// Replaces the built-in directory data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model for the plain chat endpoint
    pub model: String,

    /// Model for web-search answers and their chat fallback
    pub search_model: String,

    pub chat_url: String,
    pub responses_url: String,

    pub timeout_secs: u64,
    pub max_attempts: u32,

    /// Most recent history messages forwarded upstream
    pub history_window: usize,

    pub temperature: f32,
    pub chat_max_tokens: u32,
    pub search_max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4.1".to_string(),
            search_model: "gpt-4o".to_string(),
            chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
            responses_url: "https://api.openai.com/v1/responses".to_string(),
            timeout_secs: 60,
            max_attempts: 2,
            history_window: 10,
            temperature: 0.7,
            chat_max_tokens: 1000,
            search_max_tokens: 1500,
        }
    }
}

/// Secondary conversational-agent backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalAgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for PersonalAgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "http://localhost:8080/v1".to_string(),
            timeout_secs: 60,
            max_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_engine_id: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_engine_id: None,
            api_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NaverConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for NaverConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_url: "https://openapi.naver.com/v1/search/image".to_string(),
            timeout_secs: 10,
        }
    }
}

/// og:image scraping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub user_agent: String,
    pub follow_redirects: bool,

    pub timeout_ms: u64,
    pub retries: u32,

    /// Per-page settings when scraping a whole source list
    pub bulk_timeout_ms: u64,
    pub bulk_retries: u32,
    pub max_concurrent: usize,
    pub batch_delay_ms: u64,

    pub server_backoff_ms: u64,
    pub network_backoff_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; OGImageBot/1.0)".to_string(),
            follow_redirects: true,
            timeout_ms: 10_000,
            retries: 2,
            bulk_timeout_ms: 8_000,
            bulk_retries: 1,
            max_concurrent: 2,
            batch_delay_ms: 500,
            server_backoff_ms: 1_000,
            network_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProxyConfig {
    pub user_agent: String,
    pub referer: String,
    pub timeout_secs: u64,
    pub cache_max_age_secs: u64,
    /// Attempts for the upstream GET, before any bytes are streamed
    pub max_attempts: u32,

    /// Outbound HTTP proxy for image fetches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_proxy: Option<String>,
}

impl Default for ImageProxyConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; KRCImageProxy/1.0)".to_string(),
            referer: "https://news.naver.com/".to_string(),
            timeout_secs: 10,
            cache_max_age_secs: 86_400,
            max_attempts: 2,
            upstream_proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_sources: usize,
    pub max_images: usize,
    /// Placeholders are added until this many images exist
    pub min_images: usize,
    /// Sources scraped for og:image
    pub preview_source_limit: usize,
    pub web_results: usize,
    pub image_results_per_keyword: usize,
    /// Keyword combinations tried for image search
    pub max_image_keywords: usize,
    /// `{text}` is replaced with the URL-encoded caption
    pub placeholder_image_url: String,
    pub weights: ScoringWeights,
    /// Person records older than this are logged as possibly stale
    pub person_record_max_age_days: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_sources: 8,
            max_images: 6,
            min_images: 3,
            preview_source_limit: 6,
            web_results: 5,
            image_results_per_keyword: 10,
            max_image_keywords: 3,
            placeholder_image_url: "https://placehold.co/600x400?text={text}".to_string(),
            weights: ScoringWeights::default(),
            person_record_max_age_days: 365,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Also write logs to this file (directory if it ends with a separator)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    pub rotation: LogRotation,

    /// Rotated files kept (default: 7 daily / 20 session)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep: Option<usize>,
}

/// Log file rotation strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    None,
    #[default]
    Daily,
    /// One file per process start
    Session,
}
