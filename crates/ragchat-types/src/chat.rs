use serde::{Deserialize, Deserializer, Serialize};

use crate::conversation::ThreadId;

/// Body of `POST /chat`
///
/// Leaving `thread_id` empty asks the backend to start a new conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            thread_id: None,
        }
    }

    pub fn in_thread(mut self, thread_id: Option<ThreadId>) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn starts_new_thread(&self) -> bool {
        self.thread_id.is_none()
    }
}

/// Answer to a chat request; `thread_id` is always the concrete thread used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub thread_id: ThreadId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
