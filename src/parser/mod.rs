//! Interpretation of untyped upstream completion envelopes.
//!
//! The responses API has shipped several envelope layouts. Rather than one
//! typed model, the parser tries a fixed list of [`Strategy`] variants and
//! keeps the first one that yields text. Citations are gathered by a separate
//! pass in [`sources`].

mod sources;
mod strategy;

pub use sources::{extract_sources, MAX_SCANNED_SOURCES};
pub use strategy::Strategy;

use serde::Serialize;
use serde_json::Value;

use crate::directory::Directory;
use crate::model::SourceRecord;

/// Normalized view of an upstream response
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAiResponse {
    pub ai_response: String,
    pub sources: Vec<SourceRecord>,
    pub web_search_performed: bool,
    /// Strategy that produced `ai_response`, if any did
    #[serde(skip)]
    pub strategy: Option<Strategy>,
}

/// Parse an arbitrary upstream response.
///
/// Never fails: a response matching no known layout yields empty text.
pub fn parse_upstream_response(
    response: &Value,
    query: &str,
    directory: &Directory,
) -> ParsedAiResponse {
    let found = Strategy::ORDER
        .iter()
        .find_map(|strategy| strategy.extract(response).map(|text| (*strategy, text)));

    let (strategy, ai_response) = match found {
        Some((strategy, text)) => (Some(strategy), text.trim().to_string()),
        None => (None, String::new()),
    };

    let web_search_performed = strategy::web_search_performed(response);
    let sources = extract_sources(response, query, directory);

    tracing::debug!(
        strategy = ?strategy,
        text_len = ai_response.len(),
        source_count = sources.len(),
        web_search_performed,
        "parsed upstream response"
    );

    ParsedAiResponse {
        ai_response,
        sources,
        web_search_performed,
        strategy,
    }
}
