use serde_json::Value;

/// Strings shorter than this are ignored by the deep scan
const DEEP_SCAN_MIN_LEN: usize = 10;

/// Envelope metadata; never answer text
const DEEP_SCAN_SKIPPED_KEYS: [&str; 6] = ["type", "id", "status", "role", "model", "object"];

/// One known response layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `output[]` of typed items; text from `message` items
    OutputItems,
    /// flat `output_text`
    OutputText,
    /// `content` as a string or an array of strings / `{text}` objects
    Content,
    /// `text`
    Text,
    /// `message` as a string or `{content}`
    Message,
    /// chat completion: `choices[0].message.content` or `choices[0].text`
    Choices,
    /// the response is itself a string
    Bare,
    /// Last resort: the longest string anywhere in the tree, skipping
    /// envelope metadata keys.
    ///
    /// Imprecise by nature; it can still pick up echoed prompts or URLs.
    DeepScan,
}

impl Strategy {
    pub const ORDER: [Strategy; 8] = [
        Strategy::OutputItems,
        Strategy::OutputText,
        Strategy::Content,
        Strategy::Text,
        Strategy::Message,
        Strategy::Choices,
        Strategy::Bare,
        Strategy::DeepScan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::OutputItems => "output_items",
            Strategy::OutputText => "output_text",
            Strategy::Content => "content",
            Strategy::Text => "text",
            Strategy::Message => "message",
            Strategy::Choices => "choices",
            Strategy::Bare => "bare_string",
            Strategy::DeepScan => "deep_scan",
        }
    }

    /// Text found by this strategy; `None` when absent or blank
    pub fn extract(self, value: &Value) -> Option<String> {
        let text = match self {
            Strategy::OutputItems => output_items(value),
            Strategy::OutputText => str_field(value, "output_text"),
            Strategy::Content => content(value.get("content")?),
            Strategy::Text => str_field(value, "text"),
            Strategy::Message => match value.get("message")? {
                Value::String(s) => Some(s.clone()),
                other => str_field(other, "content"),
            },
            Strategy::Choices => {
                let choice = value.get("choices")?.get(0)?;
                choice
                    .get("message")
                    .and_then(|m| str_field(m, "content"))
                    .filter(|s| !s.is_empty())
                    .or_else(|| str_field(choice, "text"))
            }
            Strategy::Bare => value.as_str().map(str::to_string),
            Strategy::DeepScan => {
                let mut longest: Option<&str> = None;
                deep_scan(value, &mut longest);
                longest.map(str::to_string)
            }
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

/// True when the response records a web search tool call
pub fn web_search_performed(value: &Value) -> bool {
    output(value).any(|item| item_type(item) == Some("web_search_call"))
}

pub(crate) fn output(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

pub(crate) fn item_type(item: &Value) -> Option<&str> {
    item.get("type").and_then(Value::as_str)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn output_items(value: &Value) -> Option<String> {
    let mut text = String::new();

    for item in output(value) {
        if item_type(item) == Some("message") {
            if let Some(entries) = item.get("content").and_then(Value::as_array) {
                for entry in entries {
                    let piece = match entry {
                        Value::String(s) => Some(s.as_str()),
                        _ => entry
                            .get("text")
                            .and_then(Value::as_str)
                            .filter(|s| !s.is_empty())
                            .or_else(|| entry.get("content").and_then(Value::as_str)),
                    };
                    if let Some(piece) = piece {
                        text.push_str(piece);
                    }
                }
            }
        }

        if let Some(s) = item.get("text").and_then(Value::as_str) {
            text.push_str(s);
        }
        if let Some(s) = item.get("content").and_then(Value::as_str) {
            text.push_str(s);
        }
    }

    Some(text)
}

fn content(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str()),
                    _ => item.get("text").and_then(Value::as_str),
                })
                .collect(),
        ),
        _ => None,
    }
}

fn deep_scan<'a>(value: &'a Value, longest: &mut Option<&'a str>) {
    match value {
        Value::String(s) => {
            let len = s.chars().count();
            if len > DEEP_SCAN_MIN_LEN && longest.map_or(true, |l| len > l.chars().count()) {
                *longest = Some(s);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| deep_scan(item, longest)),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !DEEP_SCAN_SKIPPED_KEYS.contains(&key.as_str()))
            .for_each(|(_, item)| deep_scan(item, longest)),
        _ => {}
    }
}
