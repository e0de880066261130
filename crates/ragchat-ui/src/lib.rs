//! View state for the RAG chat client.
//!
//! Views are plain state machines. The [`Shell`] owns them together with the
//! active thread id, spawns backend calls as tasks and applies their results
//! when they come back as [`AppEvent`]s.

pub mod cache;
pub mod chat;
pub mod list;
pub mod notification;
pub mod render;
pub mod shell;
pub mod status;

pub use cache::{FetchTicket, QueryCache, QueryKey};
pub use chat::{
    ChatView, HistoryState, PendingSend, SendEffects, SendOutcome, SendRejected, SendState,
};
pub use list::{sort_conversations, ConversationListView, ListEffects, RenameDraft, RenameRequest};
pub use notification::{Notification, NotificationLevel};
pub use shell::{AppEvent, Shell};
pub use status::{PollIntervals, StatusPoller, StatusView};
