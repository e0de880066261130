use ragchat_client::ApiError;
use ragchat_types::{ConversationSummary, ThreadId};

use crate::cache::{FetchTicket, QueryCache, QueryKey};
use crate::notification::Notification;

pub const DELETED_MESSAGE: &str = "Conversation deleted";

/// Inline title editor replacing one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDraft {
    pub thread_id: ThreadId,
    pub title: String,
}

/// Confirmed rename, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
    pub thread_id: ThreadId,
    pub title: String,
}

/// What the caller has to do after a rename or delete settles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListEffects {
    pub refresh_conversations: bool,
    /// The deleted thread was the active one
    pub clear_active: bool,
    pub notification: Option<Notification>,
}

/// Most recently updated first; ties keep backend order
pub fn sort_conversations(conversations: &mut [ConversationSummary]) {
    conversations.sort_by(|a, b| b.updated_at.to_datetime().cmp(&a.updated_at.to_datetime()));
}

/// Sidebar list of conversations
#[derive(Debug, Default)]
pub struct ConversationListView {
    conversations: Vec<ConversationSummary>,
    loaded: bool,
    loading: Option<FetchTicket>,
    error: Option<String>,
    rename: Option<RenameDraft>,
    delete_confirmation: Option<ThreadId>,
}

impl ConversationListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn get(&self, index: usize) -> Option<&ConversationSummary> {
        self.conversations.get(index)
    }

    pub fn find(&self, thread_id: &ThreadId) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| &c.thread_id == thread_id)
    }

    /// True only until the first list arrives
    pub fn is_loading(&self) -> bool {
        self.loading.is_some() && !self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_refresh(&mut self, cache: &mut QueryCache) -> FetchTicket {
        let ticket = cache.begin(QueryKey::Conversations);
        self.loading = Some(ticket.clone());
        ticket
    }

    /// Apply a list fetch; superseded results are dropped
    pub fn apply_refresh(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<ConversationSummary>, ApiError>,
        cache: &QueryCache,
    ) -> bool {
        if !cache.is_latest(ticket) {
            tracing::debug!(generation = ticket.generation, "Discarding superseded conversation list");
            return false;
        }
        self.loading = None;

        match result {
            Ok(mut conversations) => {
                sort_conversations(&mut conversations);
                tracing::debug!(count = conversations.len(), "Conversation list refreshed");
                self.conversations = conversations;
                self.loaded = true;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to refresh conversation list");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn rename_draft(&self) -> Option<&RenameDraft> {
        self.rename.as_ref()
    }

    /// Open the inline editor seeded with the current title
    pub fn start_rename(&mut self, thread_id: &ThreadId) -> bool {
        let Some(conversation) = self.find(thread_id) else {
            return false;
        };
        self.rename = Some(RenameDraft {
            thread_id: thread_id.clone(),
            title: conversation.title.clone(),
        });
        true
    }

    pub fn edit_rename(&mut self, title: impl Into<String>) {
        if let Some(draft) = self.rename.as_mut() {
            draft.title = title.into();
        }
    }

    pub fn cancel_rename(&mut self) {
        self.rename = None;
    }

    /// Close the editor and hand back the request, unless the title is blank
    ///
    /// A blank title leaves the editor open and nothing is sent.
    pub fn confirm_rename(&mut self) -> Option<RenameRequest> {
        let draft = self.rename.as_ref()?;
        if draft.title.trim().is_empty() {
            return None;
        }
        let draft = self.rename.take()?;
        Some(RenameRequest {
            thread_id: draft.thread_id,
            title: draft.title,
        })
    }

    pub fn complete_rename(&mut self, thread_id: &ThreadId, result: Result<(), ApiError>) -> ListEffects {
        match result {
            Ok(()) => ListEffects {
                refresh_conversations: true,
                ..ListEffects::default()
            },
            Err(err) => {
                tracing::warn!(thread_id = %thread_id, error = %err, "Failed to rename conversation");
                ListEffects {
                    notification: Some(Notification::error(format!("Failed to rename conversation: {}", err))),
                    ..ListEffects::default()
                }
            }
        }
    }

    pub fn pending_delete(&self) -> Option<&ThreadId> {
        self.delete_confirmation.as_ref()
    }

    /// Ask for confirmation before deleting
    pub fn request_delete(&mut self, thread_id: &ThreadId) -> bool {
        if self.find(thread_id).is_none() {
            return false;
        }
        self.delete_confirmation = Some(thread_id.clone());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirmation = None;
    }

    pub fn confirm_delete(&mut self) -> Option<ThreadId> {
        self.delete_confirmation.take()
    }

    pub fn complete_delete(
        &mut self,
        thread_id: &ThreadId,
        result: Result<(), ApiError>,
        active: Option<&ThreadId>,
        cache: &mut QueryCache,
    ) -> ListEffects {
        match result {
            Ok(()) => {
                cache.remove_detail(thread_id);
                if self.rename.as_ref().map(|d| &d.thread_id) == Some(thread_id) {
                    self.rename = None;
                }
                ListEffects {
                    refresh_conversations: true,
                    clear_active: active == Some(thread_id),
                    notification: Some(Notification::info(DELETED_MESSAGE)),
                }
            }
            Err(err) => {
                tracing::warn!(thread_id = %thread_id, error = %err, "Failed to delete conversation");
                ListEffects {
                    notification: Some(Notification::error(format!("Failed to delete conversation: {}", err))),
                    ..ListEffects::default()
                }
            }
        }
    }
}
