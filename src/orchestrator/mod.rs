//! Web-search answer pipeline.
//!
//! One request runs: person classification, web search, image search, the
//! web-search completion, then answer assembly. Enrichment failures only
//! shrink the result; the completion call decides between a full answer,
//! the chat fallback, or a degraded answer built from directory data.

mod answer;
mod classify;
mod images;
mod keywords;

pub use answer::references_section;
pub use classify::{classify_query, PersonMatch};
pub use images::{assemble_images, MergeOrder, PlaceholderImages};
pub use keywords::image_keywords;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{Config, OrchestratorConfig};
use crate::directory::{Directory, PersonRecord};
use crate::llm::types::build_conversation;
use crate::llm::{LlmError, Message, OpenAiClient};
use crate::model::{dedup_by_url, ImageOrigin, ImageRecord, SourceRecord};
use crate::parser::parse_upstream_response;
use crate::preview::{domain_name, PreviewExtractor};
use crate::search::providers::{GoogleSearchProvider, NaverImageProvider};
use crate::search::{
    HybridImageSearch, ImageSearchProvider, RelevanceContext, SearchOptions, SearchProvider,
};

/// Body of a web-search answer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub success: bool,
    pub response: String,
    pub sources: Vec<SourceRecord>,
    pub images: Vec<ImageRecord>,
    pub usage: Option<Value>,
    pub search_performed: bool,
    /// Sources that came from the search itself rather than directory data
    pub real_sources: usize,
    /// Images that are not placeholders
    pub real_images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub debug: SearchDebug,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDebug {
    pub response_type: &'static str,
    pub has_output: bool,
    pub output_length: usize,
    pub response_length: usize,
    pub parsing_method: String,
    pub image_extraction_method: &'static str,
    pub person_query: bool,
    pub directory_version: String,
}

/// Everything gathered before the answer is assembled
struct Draft<'a> {
    query: &'a str,
    matched: Option<PersonMatch<'a>>,
    answer: String,
    parsed_sources: Vec<SourceRecord>,
    searched_sources: Vec<SourceRecord>,
    searched_images: Vec<ImageRecord>,
    usage: Option<Value>,
    search_performed: bool,
    note: Option<String>,
    debug: SearchDebug,
}

pub struct Orchestrator {
    openai: OpenAiClient,
    web_search: Option<Arc<dyn SearchProvider>>,
    images: HybridImageSearch,
    preview: PreviewExtractor,
    directory: Arc<Directory>,
    config: OrchestratorConfig,
    history_window: usize,
    preview_concurrency: usize,
}

impl Orchestrator {
    /// Wire up clients from config. Unconfigured search providers are left
    /// out rather than failing every call.
    pub fn from_config(config: &Config, directory: Arc<Directory>) -> Result<Self, reqwest::Error> {
        let openai = OpenAiClient::new(config.openai.clone())?;
        let google = GoogleSearchProvider::new(config.google.clone(), directory.clone())?;
        let naver = NaverImageProvider::new(config.naver.clone(), directory.clone())?;

        let mut image_providers: Vec<Arc<dyn ImageSearchProvider>> = Vec::new();
        if naver.is_configured() {
            image_providers.push(Arc::new(naver));
        }
        let web_search: Option<Arc<dyn SearchProvider>> = if google.is_configured() {
            let google = Arc::new(google);
            image_providers.push(google.clone());
            Some(google)
        } else {
            None
        };

        tracing::info!(
            web_search = web_search.is_some(),
            image_providers = image_providers.len(),
            directory_version = %directory.version,
            "search orchestrator ready"
        );

        Ok(Self {
            openai,
            web_search,
            images: HybridImageSearch::new(image_providers),
            preview: PreviewExtractor::new(&config.preview, directory.clone())?,
            directory,
            config: config.orchestrator.clone(),
            history_window: config.openai.history_window,
            preview_concurrency: config.preview.max_concurrent,
        })
    }

    /// Answer `query` with web search.
    ///
    /// Returns `Err` only for a missing key and for upstream 401/429/503,
    /// which the HTTP layer maps to dedicated messages. Every other failure
    /// becomes a fallback answer.
    pub async fn run(&self, query: &str, history: &[Message]) -> Result<SearchOutcome, LlmError> {
        if !self.openai.is_configured() {
            return Err(LlmError::MissingApiKey);
        }

        let matched = classify_query(query, &self.directory);
        let person = matched.map(|m| m.person);
        if let Some(person) = person {
            self.warn_if_stale(person);
        }

        tracing::info!(
            query = %query,
            person_query = matched.is_some(),
            history = history.len(),
            "web search request"
        );

        let searched_sources = self.web_sources(query).await;
        let searched_images = self.searched_images(query, person).await;

        let options = self.openai.search_options();
        let raw = match self
            .openai
            .respond_with_web_search(&self.search_messages(query, history, person), &options)
            .await
        {
            Ok(raw) => raw,
            Err(e) if is_surfaced(&e) => return Err(e),
            Err(e) if e.is_unsupported() => {
                tracing::warn!(error = %e, "responses api unavailable, falling back to chat");
                return Ok(self
                    .chat_fallback(query, history, matched, searched_sources, searched_images)
                    .await);
            }
            Err(e) => {
                tracing::error!(error = %e, "web search completion failed");
                return Ok(self.degraded(query, person, &e.to_string()));
            }
        };

        let parsed = parse_upstream_response(&raw, query, &self.directory);
        let answer = if !parsed.ai_response.is_empty() {
            parsed.ai_response
        } else if parsed.web_search_performed {
            tracing::warn!(query = %query, "web search ran but no text was recovered");
            answer::search_unprocessed(query)
        } else {
            tracing::warn!(query = %query, "empty completion without web search, asking chat");
            self.plain_answer(query, history, person)
                .await
                .unwrap_or_else(|| answer::ask_more_specifically(query))
        };

        let debug = SearchDebug {
            response_type: json_type(&raw),
            has_output: raw.get("output").is_some(),
            output_length: match raw.get("output") {
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
                None => 0,
            },
            parsing_method: parsed
                .strategy
                .map_or("none", |s| s.name())
                .to_string(),
            ..SearchDebug::default()
        };

        Ok(self
            .finish(Draft {
                query,
                matched,
                answer,
                parsed_sources: parsed.sources,
                searched_sources,
                searched_images,
                usage: raw.get("usage").filter(|u| !u.is_null()).cloned(),
                search_performed: parsed.web_search_performed,
                note: None,
                debug,
            })
            .await)
    }

    async fn chat_fallback(
        &self,
        query: &str,
        history: &[Message],
        matched: Option<PersonMatch<'_>>,
        searched_sources: Vec<SourceRecord>,
        searched_images: Vec<ImageRecord>,
    ) -> SearchOutcome {
        let person = matched.map(|m| m.person);
        let messages = self.fallback_messages(query, history, person);

        match self.openai.chat(&messages, &self.openai.search_options()).await {
            Ok(completion) => {
                self.finish(Draft {
                    query,
                    matched,
                    answer: completion.content,
                    parsed_sources: Vec::new(),
                    searched_sources,
                    searched_images,
                    usage: completion.usage,
                    search_performed: false,
                    note: Some(answer::UNSUPPORTED_NOTE.to_string()),
                    debug: SearchDebug {
                        response_type: "object",
                        parsing_method: "chat_fallback".to_string(),
                        ..SearchDebug::default()
                    },
                })
                .await
            }
            Err(e) => {
                tracing::error!(error = %e, "chat fallback failed");
                self.degraded(query, person, answer::ALL_CALLS_FAILED)
            }
        }
    }

    /// Plain chat completion used when the web-search answer came back empty
    async fn plain_answer(
        &self,
        query: &str,
        history: &[Message],
        person: Option<&PersonRecord>,
    ) -> Option<String> {
        let messages = self.fallback_messages(query, history, person);
        match self.openai.chat(&messages, &self.openai.search_options()).await {
            Ok(completion) if !completion.content.trim().is_empty() => Some(completion.content),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "fallback chat completion failed");
                None
            }
        }
    }

    async fn finish(&self, draft: Draft<'_>) -> SearchOutcome {
        let person = draft.matched.map(|m| m.person);

        let found = dedup_by_url(
            draft
                .parsed_sources
                .into_iter()
                .chain(draft.searched_sources)
                .collect(),
            |s| s.url.as_str(),
        );
        let real_sources = found.len();

        let preview_targets = &found[..found.len().min(self.config.preview_source_limit)];
        let previews = self
            .preview
            .extract_preview_images_from_sources(preview_targets, self.preview_concurrency)
            .await;

        let sources = self.merge_sources(found, person);

        let (order, method) = match person {
            Some(_) => (MergeOrder::SearchedFirst, "hybrid-search+og-image"),
            None => (MergeOrder::PreviewFirst, "og-image+hybrid-search"),
        };
        let images = assemble_images(
            previews,
            draft.searched_images,
            order,
            &self.placeholders(draft.query, person),
            self.config.min_images,
            self.config.max_images,
        );
        let real_images = images
            .iter()
            .filter(|i| i.method != ImageOrigin::Placeholder)
            .count();

        let mut response = draft.answer;
        if let Some(m) = draft.matched {
            if m.asks_identity && !response.contains(&m.person.name) {
                response = format!("{}\n\n{response}", answer::person_summary(m.person));
            }
        }
        response.push_str(&references_section(&sources));

        tracing::info!(
            response_len = response.len(),
            sources = sources.len(),
            real_sources,
            images = images.len(),
            real_images,
            "web search answer assembled"
        );

        SearchOutcome {
            success: true,
            debug: SearchDebug {
                response_length: response.len(),
                image_extraction_method: method,
                person_query: person.is_some(),
                directory_version: self.directory.version.clone(),
                ..draft.debug
            },
            response,
            sources,
            images,
            usage: draft.usage,
            search_performed: draft.search_performed,
            real_sources,
            real_images,
            note: draft.note,
            error: None,
        }
    }

    /// Answer built only from directory data, used when every call failed
    fn degraded(&self, query: &str, person: Option<&PersonRecord>, error: &str) -> SearchOutcome {
        let sources = self.merge_sources(Vec::new(), person);
        let images = self
            .placeholders(query, person)
            .generate(self.config.min_images.min(self.config.max_images), 0);
        let mut response = answer::degraded_answer(query, person, &self.directory.contact);
        response.push_str(&references_section(&sources));

        SearchOutcome {
            success: false,
            debug: SearchDebug {
                response_type: "none",
                response_length: response.len(),
                parsing_method: "degraded".to_string(),
                image_extraction_method: "placeholder",
                person_query: person.is_some(),
                directory_version: self.directory.version.clone(),
                ..SearchDebug::default()
            },
            response,
            sources,
            images,
            usage: None,
            search_performed: false,
            real_sources: 0,
            real_images: 0,
            note: None,
            error: Some(error.to_string()),
        }
    }

    /// Person source first and starred; directory fallbacks when nothing was found
    fn merge_sources(
        &self,
        found: Vec<SourceRecord>,
        person: Option<&PersonRecord>,
    ) -> Vec<SourceRecord> {
        let mut sources = Vec::with_capacity(found.len() + 1);
        if let Some(person) = person {
            let mut record = self.source_from_entry(&person.source);
            record.prioritized = true;
            sources.push(record);
        }
        sources.extend(found);

        if sources.is_empty() {
            sources.extend(
                self.directory
                    .fallback_sources
                    .iter()
                    .map(|entry| self.source_from_entry(entry)),
            );
        }

        let mut sources = dedup_by_url(sources, |s| s.url.as_str());
        sources.truncate(self.config.max_sources);
        sources
    }

    fn source_from_entry(&self, entry: &crate::directory::SourceEntry) -> SourceRecord {
        SourceRecord::from_entry(entry, domain_name(&entry.url, &self.directory.domains))
    }

    async fn web_sources(&self, query: &str) -> Vec<SourceRecord> {
        let Some(provider) = &self.web_search else {
            return Vec::new();
        };

        let options = SearchOptions {
            max_results: self.config.web_results,
            allowed_domains: Vec::new(),
            blocked_domains: self.directory.excluded_source_domains.clone(),
        };

        match provider.search(query, &options).await {
            Ok(results) => {
                tracing::debug!(
                    provider = provider.name(),
                    items = results.items.len(),
                    total = ?results.total_results,
                    "web search results"
                );
                results
                    .items
                    .into_iter()
                    .map(|item| SourceRecord {
                        domain: domain_name(&item.url, &self.directory.domains),
                        title: item.title,
                        url: item.url,
                        snippet: item.snippet,
                        prioritized: false,
                    })
                    .collect()
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "web search failed");
                Vec::new()
            }
        }
    }

    async fn searched_images(&self, query: &str, person: Option<&PersonRecord>) -> Vec<ImageRecord> {
        if self.images.is_empty() {
            return Vec::new();
        }

        let keywords = image_keywords(query, person, &self.directory, self.config.max_image_keywords);
        let options = SearchOptions {
            max_results: self.config.image_results_per_keyword,
            allowed_domains: Vec::new(),
            blocked_domains: self.directory.excluded_source_domains.clone(),
        };
        let context = person.map(RelevanceContext::for_person);

        self.images
            .search(
                &keywords,
                &options,
                context.as_ref().map(|c| (c, &self.config.weights)),
            )
            .await
    }

    fn search_messages(
        &self,
        query: &str,
        history: &[Message],
        person: Option<&PersonRecord>,
    ) -> Vec<Message> {
        let mut messages = build_conversation(
            answer::ASSISTANT_SYSTEM_PROMPT,
            history,
            self.history_window,
            &answer::search_prompt(query),
        );
        if let Some(person) = person {
            messages.insert(1, Message::system(answer::person_context(person)));
        }
        messages
    }

    fn fallback_messages(
        &self,
        query: &str,
        history: &[Message],
        person: Option<&PersonRecord>,
    ) -> Vec<Message> {
        let mut messages = build_conversation(
            answer::FALLBACK_SYSTEM_PROMPT,
            history,
            self.history_window,
            query,
        );
        if let Some(person) = person {
            messages.insert(1, Message::system(answer::person_context(person)));
        }
        messages
    }

    fn placeholders<'a>(
        &'a self,
        query: &'a str,
        person: Option<&'a PersonRecord>,
    ) -> PlaceholderImages<'a> {
        PlaceholderImages {
            template: &self.config.placeholder_image_url,
            caption: person.map_or(query, |p| p.name.as_str()),
            directory: &self.directory,
        }
    }

    fn warn_if_stale(&self, person: &PersonRecord) {
        let age = person.age_days(chrono::Local::now().date_naive());
        if age > self.config.person_record_max_age_days {
            tracing::warn!(
                name = %person.name,
                as_of = %person.as_of,
                age_days = age,
                "person record may be out of date"
            );
        }
    }
}

/// Errors the HTTP layer reports with a dedicated message instead of a fallback answer
fn is_surfaced(error: &LlmError) -> bool {
    matches!(error, LlmError::MissingApiKey) || matches!(error.status(), Some(401 | 429 | 503))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
