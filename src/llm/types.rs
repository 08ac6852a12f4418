use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The last `window` messages of `history` (most recent last)
pub fn recent_history(history: &[Message], window: usize) -> &[Message] {
    &history[history.len().saturating_sub(window)..]
}

/// `system`, then the recent history, then the new user message
pub fn build_conversation(
    system: &str,
    history: &[Message],
    window: usize,
    user: &str,
) -> Vec<Message> {
    let recent = recent_history(history, window);
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(system));
    messages.extend_from_slice(recent);
    messages.push(Message::user(user));
    messages
}

/// Result of a chat completion
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    /// Upstream token accounting, passed through untouched
    pub usage: Option<serde_json::Value>,
    pub model: String,
}
