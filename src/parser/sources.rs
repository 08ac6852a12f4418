use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::directory::Directory;
use crate::model::{dedup_by_url, SourceRecord};
use crate::parser::strategy::{item_type, output};
use crate::preview::domain_name;

/// Cap for sources recovered by the URL scan
pub const MAX_SCANNED_SOURCES: usize = 10;

const DEFAULT_TITLE: &str = "검색 결과";

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\\)\]}]+"#).expect("valid url regex"));

/// Collect citable sources from a response.
///
/// Tried in order, stopping at the first pass that finds anything:
/// `url_citation` annotations, the `results`/`sources` lists of
/// `web_search_call` items, then a URL scan over the serialized response.
pub fn extract_sources(response: &Value, query: &str, directory: &Directory) -> Vec<SourceRecord> {
    let snippet = format!("{query} 관련 검색 결과");
    let record = |title: Option<&str>, url: &str, item_snippet: Option<&str>| SourceRecord {
        title: title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        url: url.to_string(),
        snippet: item_snippet
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| snippet.clone()),
        domain: domain_name(url, &directory.domains),
        prioritized: false,
    };

    let citations: Vec<SourceRecord> = annotations(response)
        .filter(|a| item_type(a) == Some("url_citation"))
        .filter_map(|a| {
            let url = a.get("url").and_then(Value::as_str)?;
            Some(record(a.get("title").and_then(Value::as_str), url, None))
        })
        .collect();
    if !citations.is_empty() {
        return dedup_by_url(citations, |s| s.url.as_str());
    }

    let searched: Vec<SourceRecord> = output(response)
        .filter(|item| item_type(item) == Some("web_search_call"))
        .flat_map(|item| {
            [
                item.get("results"),
                item.get("sources"),
                item.get("action").and_then(|a| a.get("sources")),
            ]
        })
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|entry| {
            let url = entry.get("url").and_then(Value::as_str)?;
            Some(record(
                entry.get("title").and_then(Value::as_str),
                url,
                entry
                    .get("snippet")
                    .or_else(|| entry.get("content"))
                    .and_then(Value::as_str),
            ))
        })
        .collect();
    if !searched.is_empty() {
        return dedup_by_url(searched, |s| s.url.as_str());
    }

    let serialized = response.to_string();
    let scanned: Vec<SourceRecord> = URL
        .find_iter(&serialized)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']))
        .filter(|url| !url.contains("/api/"))
        .filter(|url| {
            url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(|h| !directory.is_excluded_source(h)))
                .unwrap_or(false)
        })
        .map(|url| record(None, url, None))
        .collect();

    let mut scanned = dedup_by_url(scanned, |s| s.url.as_str());
    scanned.truncate(MAX_SCANNED_SOURCES);
    if !scanned.is_empty() {
        tracing::debug!(count = scanned.len(), "sources recovered by url scan");
    }
    scanned
}

fn annotations(response: &Value) -> impl Iterator<Item = &Value> {
    output(response)
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| entry.get("annotations").and_then(Value::as_array))
        .flatten()
}
