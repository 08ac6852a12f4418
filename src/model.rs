use serde::{Deserialize, Serialize};

use crate::directory::SourceEntry;

/// A citable page shown under the answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub domain: String,
    /// Marked with a star in the references section
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub prioritized: bool,
}

impl SourceRecord {
    pub fn from_entry(entry: &SourceEntry, domain: String) -> Self {
        Self {
            title: entry.title.clone(),
            url: entry.url.clone(),
            snippet: entry.snippet.clone(),
            domain,
            prioritized: false,
        }
    }
}

/// Where an image record came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageOrigin {
    #[serde(rename = "og:image")]
    OgImage,
    #[serde(rename = "naver")]
    Naver,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "placeholder")]
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub url: String,
    pub title: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Page the image was found on
    pub source: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u32>,
    pub method: ImageOrigin,
}

/// Keeps the first occurrence of each URL, preserving order
pub fn dedup_by_url<T, F>(items: Vec<T>, url_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(url_of(item).to_string()))
        .collect()
}
