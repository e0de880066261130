use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// One entry of a conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// Message typed by the user
    User {
        content: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },

    /// Generated answer, optionally citing the documents it was built from
    Assistant {
        content: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        sources: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    /// Create user message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            timestamp: Some(Timestamp::now()),
        }
    }

    /// Create assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            timestamp: Some(Timestamp::now()),
            sources: Some(sources),
        }
    }

    pub fn with_timestamp(mut self, value: Timestamp) -> Self {
        match &mut self {
            Self::User { timestamp, .. } | Self::Assistant { timestamp, .. } => {
                *timestamp = Some(value);
            }
        }
        self
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::User { content, .. } | Self::Assistant { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        match self {
            Self::User { timestamp, .. } | Self::Assistant { timestamp, .. } => timestamp.as_ref(),
        }
    }

    /// Cited sources; always empty for user messages
    pub fn sources(&self) -> &[String] {
        match self {
            Self::Assistant {
                sources: Some(sources),
                ..
            } => sources,
            _ => &[],
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}
