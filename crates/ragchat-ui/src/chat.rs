use ragchat_client::ApiError;
use ragchat_types::{ChatRequest, ChatResponse, ConversationDetail, Message, ThreadId};
use thiserror::Error;

use crate::cache::{FetchTicket, QueryCache, QueryKey};
use crate::notification::Notification;

pub const SEND_FAILED_MESSAGE: &str = "Failed to send message. Check the backend connection.";
pub const HISTORY_FAILED_MESSAGE: &str = "Error loading conversation";
pub const HISTORY_NOT_FOUND_MESSAGE: &str = "Conversation not found";

/// Why a submit was refused before any request was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("Message is empty")]
    Blank,

    #[error("A message is already being sent")]
    InFlight,
}

/// Send that has been shown optimistically and is waiting for the backend
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub id: u64,
    /// Transcript the send was made from; see [`ChatView::show_thread`]
    pub view: u64,
    pub request: ChatRequest,
    /// The optimistic user message appended on submit
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Success,
    Failure(String),
}

/// `Idle -> Pending -> Settled`; a settled view accepts the next send
#[derive(Debug, Clone, PartialEq)]
pub enum SendState {
    Idle,
    Pending(PendingSend),
    Settled(SendOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState {
    /// No thread selected
    Idle,
    Loading(FetchTicket),
    Loaded,
    Failed(String),
}

/// What the caller has to do after a send settles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendEffects {
    /// Thread the backend created for a new conversation; should become active
    pub thread_created: Option<ThreadId>,
    /// Conversation summaries are out of date
    pub refresh_conversations: bool,
    /// Thread whose cached detail was marked stale
    pub invalidated: Option<ThreadId>,
    pub notification: Option<Notification>,
    /// Whether the transcript was changed
    pub applied: bool,
}

/// Transcript and composer of the thread being viewed
#[derive(Debug)]
pub struct ChatView {
    thread_id: Option<ThreadId>,
    title: Option<String>,
    messages: Vec<Message>,
    input: String,
    send: SendState,
    history: HistoryState,
    next_send_id: u64,
    /// Bumped every time the transcript is cleared for another thread
    view: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            thread_id: None,
            title: None,
            messages: Vec::new(),
            input: String::new(),
            send: SendState::Idle,
            history: HistoryState::Idle,
            next_send_id: 0,
            view: 0,
        }
    }

    /// Thread whose transcript is shown
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn send_state(&self) -> &SendState {
        &self.send
    }

    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    /// Empty new-chat state
    pub fn is_welcome(&self) -> bool {
        self.thread_id.is_none() && self.messages.is_empty()
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self.send, SendState::Pending(_))
    }

    pub fn is_loading_history(&self) -> bool {
        matches!(self.history, HistoryState::Loading(_))
    }

    pub fn can_send(&self) -> bool {
        !self.is_thinking() && !self.input.trim().is_empty()
    }

    /// Switch the transcript to another thread (or to none)
    ///
    /// Returns the fetch to run when the thread's detail is not cached fresh.
    pub fn show_thread(
        &mut self,
        thread_id: Option<ThreadId>,
        cache: &mut QueryCache,
    ) -> Option<FetchTicket> {
        if self.thread_id != thread_id {
            self.messages.clear();
            self.title = None;
            self.view += 1;
        }
        self.thread_id = thread_id;

        match self.thread_id.clone() {
            Some(thread_id) => self.load(thread_id, cache),
            None => {
                self.history = HistoryState::Idle;
                None
            }
        }
    }

    /// Attach the current transcript to a thread the backend just created
    ///
    /// Unlike [`show_thread`](Self::show_thread) the messages stay on screen
    /// until the fetched detail replaces them.
    pub fn adopt_thread(&mut self, thread_id: ThreadId, cache: &mut QueryCache) -> Option<FetchTicket> {
        self.thread_id = Some(thread_id.clone());
        self.load(thread_id, cache)
    }

    /// Re-fetch the shown thread if its cached detail went stale
    pub fn refresh(&mut self, cache: &mut QueryCache) -> Option<FetchTicket> {
        let thread_id = self.thread_id.clone()?;
        if !cache.is_detail_stale(&thread_id) {
            return None;
        }
        Some(self.begin_fetch(thread_id, cache))
    }

    fn load(&mut self, thread_id: ThreadId, cache: &mut QueryCache) -> Option<FetchTicket> {
        if let Some(detail) = cache.fresh_detail(&thread_id).cloned() {
            self.replace_transcript(detail);
            self.history = HistoryState::Loaded;
            return None;
        }
        Some(self.begin_fetch(thread_id, cache))
    }

    fn begin_fetch(&mut self, thread_id: ThreadId, cache: &mut QueryCache) -> FetchTicket {
        let ticket = cache.begin(QueryKey::Conversation(thread_id));
        self.history = HistoryState::Loading(ticket.clone());
        ticket
    }

    /// Apply a history fetch result
    ///
    /// Results from superseded fetches are dropped. A result for a thread the
    /// user has since left is cached but not shown. Returns whether the
    /// transcript changed.
    pub fn apply_history(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ConversationDetail, ApiError>,
        cache: &mut QueryCache,
    ) -> bool {
        let Some(thread_id) = ticket.thread_id().cloned() else {
            return false;
        };

        if !cache.is_latest(ticket) {
            tracing::debug!(thread_id = %thread_id, generation = ticket.generation, "Discarding superseded history fetch");
            return false;
        }

        let showing = self.thread_id.as_ref() == Some(&thread_id);

        match result {
            Ok(detail) => {
                cache.store_detail(thread_id.clone(), detail.clone());
                if !showing {
                    tracing::debug!(thread_id = %thread_id, "History arrived for a thread no longer shown");
                    return false;
                }
                self.replace_transcript(detail);
                self.history = HistoryState::Loaded;
                true
            }
            Err(err) => {
                if !showing {
                    return false;
                }
                tracing::warn!(thread_id = %thread_id, error = %err, "Failed to load conversation");
                let message = if err.is_not_found() {
                    HISTORY_NOT_FOUND_MESSAGE
                } else {
                    HISTORY_FAILED_MESSAGE
                };
                self.history = HistoryState::Failed(message.to_string());
                true
            }
        }
    }

    /// Server transcript wins, except for a send still waiting on this thread
    fn replace_transcript(&mut self, detail: ConversationDetail) {
        self.title = Some(detail.title);
        self.messages = detail.messages;

        if let SendState::Pending(pending) = &self.send {
            let same_view = pending.view == self.view;
            let already_stored = self
                .messages
                .last()
                .map(|last| last.is_user() && last.content() == pending.message.content())
                .unwrap_or(false);
            if same_view && !already_stored {
                self.messages.push(pending.message.clone());
            }
        }
    }

    /// Validate the composer, show the user message and start a send
    pub fn begin_send(&mut self) -> Result<PendingSend, SendRejected> {
        if self.input.trim().is_empty() {
            return Err(SendRejected::Blank);
        }
        if self.is_thinking() {
            return Err(SendRejected::InFlight);
        }

        let query = std::mem::take(&mut self.input);
        let message = Message::user(query.clone());
        self.messages.push(message.clone());

        self.next_send_id += 1;
        let pending = PendingSend {
            id: self.next_send_id,
            view: self.view,
            request: ChatRequest::new(query).in_thread(self.thread_id.clone()),
            message,
        };
        self.send = SendState::Pending(pending.clone());

        Ok(pending)
    }

    /// Settle the pending send with the backend's answer
    pub fn complete_send(
        &mut self,
        send_id: u64,
        result: Result<ChatResponse, ApiError>,
        cache: &mut QueryCache,
    ) -> SendEffects {
        let pending = match &self.send {
            SendState::Pending(pending) if pending.id == send_id => pending.clone(),
            _ => {
                tracing::debug!(send_id, "Ignoring result for a send that is not pending");
                return SendEffects::default();
            }
        };

        // The user may have switched threads while waiting, possibly back to
        // a fresh new-chat view with the same (absent) thread id
        let same_view = pending.view == self.view;

        match result {
            Ok(response) => {
                self.send = SendState::Settled(SendOutcome::Success);
                cache.invalidate_detail(&response.thread_id);

                let mut effects = SendEffects {
                    refresh_conversations: true,
                    invalidated: Some(response.thread_id.clone()),
                    ..SendEffects::default()
                };

                if same_view {
                    self.messages
                        .push(Message::assistant(response.answer, response.sources));
                    if pending.request.starts_new_thread() {
                        effects.thread_created = Some(response.thread_id);
                    }
                    effects.applied = true;
                } else {
                    tracing::debug!(thread_id = %response.thread_id, "Answer arrived after the user left the thread");
                }

                effects
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to send message");
                self.send = SendState::Settled(SendOutcome::Failure(err.to_string()));
                SendEffects {
                    notification: Some(Notification::error(SEND_FAILED_MESSAGE)),
                    ..SendEffects::default()
                }
            }
        }
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_types::Role;

    fn response(answer: &str, thread_id: &str) -> ChatResponse {
        ChatResponse {
            answer: answer.to_string(),
            thread_id: ThreadId::from(thread_id),
            sources: Vec::new(),
        }
    }

    fn detail(messages: Vec<Message>) -> ConversationDetail {
        ConversationDetail {
            title: "Thread".to_string(),
            messages,
        }
    }

    #[test]
    fn test_welcome_state() {
        let view = ChatView::new();
        assert!(view.is_welcome());
        assert!(view.messages().is_empty());
        assert!(!view.can_send());
    }

    #[test]
    fn test_blank_input_rejected_without_state_change() {
        let mut view = ChatView::new();
        view.set_input("   \n\t");

        assert_eq!(view.begin_send(), Err(SendRejected::Blank));
        assert!(view.messages().is_empty());
        assert_eq!(view.send_state(), &SendState::Idle);
    }

    #[test]
    fn test_optimistic_message_and_cleared_input() {
        let mut view = ChatView::new();
        view.set_input("Hello");

        let pending = view.begin_send().unwrap();

        assert_eq!(view.input(), "");
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.messages()[0].content(), "Hello");
        assert!(view.messages()[0].timestamp().is_some());
        assert!(pending.request.starts_new_thread());
        assert!(view.is_thinking());
    }

    #[test]
    fn test_double_submit_rejected_while_pending() {
        let mut view = ChatView::new();
        view.set_input("Hello");
        view.begin_send().unwrap();

        view.set_input("Hello");
        assert_eq!(view.begin_send(), Err(SendRejected::InFlight));
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn test_success_appends_answer_and_reports_new_thread() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();

        let effects = view.complete_send(pending.id, Ok(response("Hi", "t1")), &mut cache);

        let roles: Vec<Role> = view.messages().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(view.messages()[1].content(), "Hi");
        assert_eq!(effects.thread_created, Some(ThreadId::from("t1")));
        assert!(effects.refresh_conversations);
        assert_eq!(view.send_state(), &SendState::Settled(SendOutcome::Success));
    }

    #[test]
    fn test_existing_thread_does_not_report_creation() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        let id = ThreadId::from("t1");
        cache.store_detail(id.clone(), detail(Vec::new()));
        assert!(view.show_thread(Some(id.clone()), &mut cache).is_none());

        view.set_input("More");
        let pending = view.begin_send().unwrap();
        assert_eq!(pending.request.thread_id, Some(id.clone()));

        let effects = view.complete_send(pending.id, Ok(response("Sure", "t1")), &mut cache);

        assert!(effects.thread_created.is_none());
        assert_eq!(effects.invalidated, Some(id.clone()));
        assert!(cache.is_detail_stale(&id));
    }

    #[test]
    fn test_failure_keeps_optimistic_message() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();

        let effects = view.complete_send(
            pending.id,
            Err(ApiError::Network("connection refused".to_string())),
            &mut cache,
        );

        assert_eq!(view.messages().len(), 1);
        assert!(view.messages()[0].is_user());
        assert!(effects.notification.as_ref().unwrap().is_error());
        assert!(!effects.refresh_conversations);
        assert!(view.begin_send().is_err());
        view.set_input("Retry");
        assert!(view.begin_send().is_ok());
    }

    #[test]
    fn test_duplicate_completion_ignored() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();

        view.complete_send(pending.id, Ok(response("Hi", "t1")), &mut cache);
        let second = view.complete_send(pending.id, Ok(response("Hi", "t1")), &mut cache);

        assert_eq!(second, SendEffects::default());
        assert_eq!(view.messages().len(), 2);
    }

    #[test]
    fn test_answer_after_switching_thread_not_shown() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();

        let ticket = view.show_thread(Some(ThreadId::from("other")), &mut cache);
        assert!(ticket.is_some());

        let effects = view.complete_send(pending.id, Ok(response("Hi", "t9")), &mut cache);

        assert!(!effects.applied);
        assert!(effects.thread_created.is_none());
        assert!(effects.refresh_conversations);
        assert!(view.messages().is_empty());
    }

    #[test]
    fn test_answer_after_returning_to_new_chat_not_shown() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();

        view.show_thread(Some(ThreadId::from("a")), &mut cache);
        view.show_thread(None, &mut cache);
        assert!(view.is_welcome());

        let effects = view.complete_send(pending.id, Ok(response("Hi", "t1")), &mut cache);

        assert!(!effects.applied);
        assert!(effects.thread_created.is_none());
        assert!(effects.refresh_conversations);
        assert!(view.messages().is_empty());
        assert!(view.is_welcome());
    }

    #[test]
    fn test_superseded_history_discarded() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        let t1 = ThreadId::from("t1");

        let first = view.show_thread(Some(t1.clone()), &mut cache).unwrap();
        view.show_thread(None, &mut cache);
        let second = view.show_thread(Some(t1.clone()), &mut cache).unwrap();

        assert!(view.apply_history(&second, Ok(detail(vec![Message::user("new")])), &mut cache));
        assert!(!view.apply_history(&first, Ok(detail(vec![Message::user("old")])), &mut cache));

        assert_eq!(view.messages()[0].content(), "new");
        assert_eq!(cache.fresh_detail(&t1).unwrap().messages[0].content(), "new");
    }

    #[test]
    fn test_history_for_left_thread_not_shown() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        let t1 = ThreadId::from("t1");
        let t2 = ThreadId::from("t2");

        let slow = view.show_thread(Some(t1.clone()), &mut cache).unwrap();
        let fast = view.show_thread(Some(t2.clone()), &mut cache).unwrap();

        assert!(view.apply_history(&fast, Ok(detail(vec![Message::user("from t2")])), &mut cache));
        assert!(!view.apply_history(&slow, Ok(detail(vec![Message::user("from t1")])), &mut cache));

        assert_eq!(view.thread_id(), Some(&t2));
        assert_eq!(view.messages()[0].content(), "from t2");
        // The late result for t1 is still worth caching
        assert!(cache.fresh_detail(&t1).is_some());
    }

    #[test]
    fn test_history_for_thread_left_for_new_chat_discarded() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();

        let ticket = view.show_thread(Some(ThreadId::from("t1")), &mut cache).unwrap();
        view.show_thread(None, &mut cache);

        assert!(!view.apply_history(&ticket, Ok(detail(vec![Message::user("x")])), &mut cache));
        assert!(view.is_welcome());
    }

    #[test]
    fn test_history_failure_is_inline() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        let ticket = view.show_thread(Some(ThreadId::from("gone")), &mut cache).unwrap();
        assert!(view.is_loading_history());

        view.apply_history(&ticket, Err(ApiError::NotFound("/conversations/gone".to_string())), &mut cache);

        assert_eq!(
            view.history(),
            &HistoryState::Failed(HISTORY_NOT_FOUND_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_reconciliation_keeps_pending_message() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        let id = ThreadId::from("t1");
        let ticket = view.show_thread(Some(id), &mut cache).unwrap();

        view.set_input("Second question");
        view.begin_send().unwrap();

        let server = vec![Message::user("First"), Message::assistant("Answer", Vec::new())];
        assert!(view.apply_history(&ticket, Ok(detail(server)), &mut cache));

        let contents: Vec<&str> = view.messages().iter().map(Message::content).collect();
        assert_eq!(contents, vec!["First", "Answer", "Second question"]);
    }

    #[test]
    fn test_adopt_thread_keeps_transcript_until_fetched() {
        let mut cache = QueryCache::new();
        let mut view = ChatView::new();
        view.set_input("Hello");
        let pending = view.begin_send().unwrap();
        let effects = view.complete_send(pending.id, Ok(response("Hi", "t1")), &mut cache);

        let ticket = view
            .adopt_thread(effects.thread_created.unwrap(), &mut cache)
            .unwrap();

        assert_eq!(view.messages().len(), 2);
        assert!(view.is_loading_history());
        assert_eq!(ticket.thread_id(), Some(&ThreadId::from("t1")));
    }
}
