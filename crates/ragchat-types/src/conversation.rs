use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::Message;
use crate::timestamp::Timestamp;

/// Title shown for conversations the backend has not named yet
pub const UNTITLED_CONVERSATION: &str = "New Chat";

/// Server-assigned conversation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row of the conversation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub thread_id: ThreadId,
    #[serde(default)]
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub message_count: u64,
}

impl ConversationSummary {
    pub fn display_title(&self) -> &str {
        display_title(&self.title)
    }
}

/// Full transcript of one conversation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationDetail {
    pub fn display_title(&self) -> &str {
        display_title(&self.title)
    }
}

/// Envelope returned by `GET /conversations`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        UNTITLED_CONVERSATION
    } else {
        title
    }
}
