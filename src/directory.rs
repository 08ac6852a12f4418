use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_DIRECTORY: &str = include_str!("../data/directory.toml");

/// Versioned reference data: host labels, person records, fallback sources.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    pub version: String,
    pub updated: NaiveDate,

    /// Contact line appended to degraded answers
    pub contact: String,

    #[serde(default)]
    pub question_keywords: Vec<String>,

    /// Suffixes appended to a general query when building image search keywords
    #[serde(default)]
    pub image_keyword_suffixes: Vec<String>,

    #[serde(default)]
    pub excluded_source_domains: Vec<String>,

    #[serde(default)]
    pub domains: Vec<DomainLabel>,

    #[serde(default)]
    pub fallback_sources: Vec<SourceEntry>,

    #[serde(default)]
    pub people: Vec<PersonRecord>,
}

/// Maps a host (matched by containment) to a display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainLabel {
    pub host: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceEntry {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    pub title: String,
    pub organization: String,
    pub since_year: u16,
    pub as_of: NaiveDate,
    pub role_keywords: Vec<String>,
    pub organization_keywords: Vec<String>,
    #[serde(default)]
    pub title_keywords: Vec<String>,
    pub profile: String,
    pub source: SourceEntry,
}

impl PersonRecord {
    /// Days between `as_of` and `today`
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.as_of).num_days()
    }
}

impl Directory {
    /// The copy compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_DIRECTORY).context("Failed to parse built-in directory data")
    }

    pub fn parse(content: &str) -> Result<Self> {
        let directory: Directory =
            toml::from_str(content).context("Failed to parse directory data")?;
        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read directory file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid directory file: {}", path.display()))
    }

    /// True when `host` belongs to a domain that never counts as a citable source
    pub fn is_excluded_source(&self, host: &str) -> bool {
        self.excluded_source_domains
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
    }
}
