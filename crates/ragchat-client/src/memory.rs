use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use ragchat_types::{
    ChatRequest, ChatResponse, ConversationDetail, ConversationSummary, HealthResponse, Message,
    StatsResponse, ThreadId, Timestamp,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::backend::ChatBackend;
use crate::error::{ApiError, Result};

const TITLE_MAX_CHARS: usize = 40;

/// Record of one request received by [`InMemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    GetHealth,
    GetStats,
    GetConversations,
    GetConversation(ThreadId),
    Chat(ChatRequest),
    Rename { thread_id: ThreadId, title: String },
    Delete(ThreadId),
}

struct StoredConversation {
    thread_id: ThreadId,
    title: String,
    created_at: Timestamp,
    updated_at: Timestamp,
    messages: Vec<Message>,
}

impl StoredConversation {
    fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            thread_id: self.thread_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            message_count: self.messages.len() as u64,
        }
    }
}

struct State {
    conversations: Vec<StoredConversation>,
    calls: Vec<BackendCall>,
    health: HealthResponse,
    stats: StatsResponse,
    answer: Option<(String, Vec<String>)>,
    offline: bool,
    chat_failure: bool,
    chat_latency: Option<Duration>,
    conversation_latency: HashMap<ThreadId, Duration>,
    next_thread: u64,
    clock: DateTime<Utc>,
}

impl State {
    fn tick(&mut self) -> Timestamp {
        self.clock += ChronoDuration::seconds(1);
        Timestamp::from(self.clock)
    }

    fn find_mut(&mut self, thread_id: &ThreadId) -> Option<&mut StoredConversation> {
        self.conversations
            .iter_mut()
            .find(|c| &c.thread_id == thread_id)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Backend that keeps conversations in process memory
///
/// Behaves like the HTTP backend closely enough for view and shell tests:
/// answers echo the query, new threads get sequential ids (`t1`, `t2`, ...),
/// and every request is recorded. Failures and latency can be injected.
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                conversations: Vec::new(),
                calls: Vec::new(),
                health: HealthResponse {
                    status: "healthy".to_string(),
                    pinecone_connected: true,
                    gemini_connected: true,
                },
                stats: StatsResponse {
                    total_vector_count: 0,
                    dimension: 768,
                    index_fullness: 0.0,
                },
                answer: None,
                offline: false,
                chat_failure: false,
                chat_latency: None,
                conversation_latency: HashMap::new(),
                next_thread: 1,
                clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a stored conversation
    pub fn with_conversation(
        self,
        thread_id: impl Into<ThreadId>,
        title: impl Into<String>,
        updated_at: impl Into<Timestamp>,
        messages: Vec<Message>,
    ) -> Self {
        {
            let mut state = self.state();
            let updated_at = updated_at.into();
            state.conversations.push(StoredConversation {
                thread_id: thread_id.into(),
                title: title.into(),
                created_at: updated_at.clone(),
                updated_at,
                messages,
            });
        }
        self
    }

    pub fn set_health(&self, health: HealthResponse) {
        self.state().health = health;
    }

    pub fn set_stats(&self, stats: StatsResponse) {
        self.state().stats = stats;
    }

    /// Fixed answer for every following chat request
    pub fn set_answer(&self, answer: impl Into<String>, sources: Vec<String>) {
        self.state().answer = Some((answer.into(), sources));
    }

    /// Fail every request with a network error
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Fail chat requests only
    pub fn set_chat_failure(&self, fail: bool) {
        self.state().chat_failure = fail;
    }

    pub fn set_chat_latency(&self, latency: Duration) {
        self.state().chat_latency = Some(latency);
    }

    pub fn set_conversation_latency(&self, thread_id: impl Into<ThreadId>, latency: Duration) {
        self.state()
            .conversation_latency
            .insert(thread_id.into(), latency);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Stored messages of a thread, `None` if the thread does not exist
    pub fn messages(&self, thread_id: &ThreadId) -> Option<Vec<Message>> {
        self.state()
            .conversations
            .iter()
            .find(|c| &c.thread_id == thread_id)
            .map(|c| c.messages.clone())
    }

    pub fn title(&self, thread_id: &ThreadId) -> Option<String> {
        self.state()
            .conversations
            .iter()
            .find(|c| &c.thread_id == thread_id)
            .map(|c| c.title.clone())
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        let mut state = self.state();
        state.calls.push(call);
        state.check_online()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for InMemoryBackend {
    async fn get_health(&self) -> Result<HealthResponse> {
        self.record(BackendCall::GetHealth)?;
        Ok(self.state().health.clone())
    }

    async fn get_stats(&self) -> Result<StatsResponse> {
        self.record(BackendCall::GetStats)?;
        Ok(self.state().stats.clone())
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.record(BackendCall::GetConversations)?;
        Ok(self.state().conversations.iter().map(StoredConversation::summary).collect())
    }

    async fn get_conversation(&self, thread_id: &ThreadId) -> Result<ConversationDetail> {
        self.record(BackendCall::GetConversation(thread_id.clone()))?;

        let latency = self.state().conversation_latency.get(thread_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state();
        state
            .conversations
            .iter()
            .find(|c| &c.thread_id == thread_id)
            .map(|c| ConversationDetail {
                title: c.title.clone(),
                messages: c.messages.clone(),
            })
            .ok_or_else(|| ApiError::NotFound(format!("/conversations/{}", thread_id)))
    }

    async fn create_or_continue_chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.record(BackendCall::Chat(request.clone()))?;

        let latency = self.state().chat_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        // Checked again so a test can take the backend down mid-request
        state.check_online()?;
        if state.chat_failure {
            return Err(ApiError::Network("connection reset by peer".to_string()));
        }

        let (answer, sources) = state
            .answer
            .clone()
            .unwrap_or_else(|| (format!("Echo: {}", request.query), Vec::new()));
        let now = state.tick();

        let thread_id = match request.thread_id {
            Some(thread_id) => {
                if state.find_mut(&thread_id).is_none() {
                    return Err(ApiError::NotFound(format!("/conversations/{}", thread_id)));
                }
                thread_id
            }
            None => {
                let thread_id = ThreadId::new(format!("t{}", state.next_thread));
                state.next_thread += 1;
                state.conversations.push(StoredConversation {
                    thread_id: thread_id.clone(),
                    title: request.query.chars().take(TITLE_MAX_CHARS).collect(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    messages: Vec::new(),
                });
                thread_id
            }
        };

        if let Some(conversation) = state.find_mut(&thread_id) {
            conversation
                .messages
                .push(Message::user(request.query.clone()).with_timestamp(now.clone()));
            conversation.messages.push(
                Message::assistant(answer.clone(), sources.clone()).with_timestamp(now.clone()),
            );
            conversation.updated_at = now;
        }

        Ok(ChatResponse {
            answer,
            thread_id,
            sources,
        })
    }

    async fn rename_conversation(&self, thread_id: &ThreadId, new_title: &str) -> Result<()> {
        self.record(BackendCall::Rename {
            thread_id: thread_id.clone(),
            title: new_title.to_string(),
        })?;

        let mut state = self.state();
        let now = state.tick();
        let conversation = state
            .find_mut(thread_id)
            .ok_or_else(|| ApiError::NotFound(format!("/conversations/{}", thread_id)))?;
        conversation.title = new_title.to_string();
        conversation.updated_at = now;
        Ok(())
    }

    async fn delete_conversation(&self, thread_id: &ThreadId) -> Result<()> {
        self.record(BackendCall::Delete(thread_id.clone()))?;

        let mut state = self.state();
        let before = state.conversations.len();
        state.conversations.retain(|c| &c.thread_id != thread_id);
        if state.conversations.len() == before {
            return Err(ApiError::NotFound(format!("/conversations/{}", thread_id)));
        }
        Ok(())
    }
}
