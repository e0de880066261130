use async_trait::async_trait;
use ragchat_types::{
    ChatRequest, ChatResponse, ConversationDetail, ConversationSummary, HealthResponse,
    StatsResponse, ThreadId,
};

use crate::error::Result;

/// Operations the RAG backend exposes to the chat client
///
/// Every method is exactly one request. Implementations do not retry and do
/// not cache; callers decide how failures are reported.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Service and dependency health
    async fn get_health(&self) -> Result<HealthResponse>;

    /// Vector index usage
    async fn get_stats(&self) -> Result<StatsResponse>;

    /// Summaries of every stored conversation, in backend order
    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>>;

    /// Full transcript of one conversation; `ApiError::NotFound` if unknown
    async fn get_conversation(&self, thread_id: &ThreadId) -> Result<ConversationDetail>;

    /// Start a conversation (no thread id) or continue an existing one
    async fn create_or_continue_chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Set a conversation's title
    async fn rename_conversation(&self, thread_id: &ThreadId, new_title: &str) -> Result<()>;

    /// Remove a conversation and its messages
    async fn delete_conversation(&self, thread_id: &ThreadId) -> Result<()>;
}
