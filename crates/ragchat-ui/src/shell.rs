use ragchat_client::{ApiError, ChatBackend};
use ragchat_types::{
    ChatResponse, ConversationDetail, ConversationSummary, HealthResponse, StatsResponse, ThreadId,
};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::{FetchTicket, QueryCache};
use crate::chat::{ChatView, SendEffects, SendRejected};
use crate::list::{ConversationListView, ListEffects};
use crate::notification::Notification;
use crate::status::{PollIntervals, StatusPoller, StatusView};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a backend call, delivered back to the shell's loop
#[derive(Debug)]
pub enum AppEvent {
    ConversationsLoaded {
        ticket: FetchTicket,
        result: Result<Vec<ConversationSummary>, ApiError>,
    },
    HistoryLoaded {
        ticket: FetchTicket,
        result: Result<ConversationDetail, ApiError>,
    },
    SendSettled {
        send_id: u64,
        result: Result<ChatResponse, ApiError>,
    },
    RenameSettled {
        thread_id: ThreadId,
        result: Result<(), ApiError>,
    },
    DeleteSettled {
        thread_id: ThreadId,
        result: Result<(), ApiError>,
    },
    Health(Result<HealthResponse, ApiError>),
    Stats(Result<StatsResponse, ApiError>),
}

impl AppEvent {
    /// Answers to requests the shell issued, as opposed to poller ticks
    fn is_request(&self) -> bool {
        !matches!(self, AppEvent::Health(_) | AppEvent::Stats(_))
    }
}

/// Owner of the shared UI state and the views
///
/// Every backend call runs as its own task and comes back as an [`AppEvent`];
/// views are only ever mutated from [`handle_event`](Self::handle_event) and
/// the user-facing methods, so no locking is needed.
pub struct Shell {
    backend: Arc<dyn ChatBackend>,
    intervals: PollIntervals,
    active: Option<ThreadId>,
    sidebar_open: bool,
    cache: QueryCache,
    list: ConversationListView,
    chat: ChatView,
    status: StatusView,
    poller: Option<StatusPoller>,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    in_flight: usize,
    notifications: VecDeque<Notification>,
}

impl Shell {
    pub fn new(backend: Arc<dyn ChatBackend>, intervals: PollIntervals) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            intervals,
            active: None,
            sidebar_open: true,
            cache: QueryCache::new(),
            list: ConversationListView::new(),
            chat: ChatView::new(),
            status: StatusView::new(),
            poller: None,
            events_tx,
            events_rx,
            in_flight: 0,
            notifications: VecDeque::new(),
        }
    }

    /// Load the conversation list and start the status pollers
    pub fn mount(&mut self) {
        self.refresh_conversations();
        if self.poller.is_none() {
            self.poller = Some(StatusPoller::spawn(
                Arc::clone(&self.backend),
                self.intervals,
                self.events_tx.clone(),
            ));
        }
    }

    /// Stop the status pollers; requests already issued still settle
    pub fn unmount(&mut self) {
        self.poller = None;
    }

    pub fn active(&self) -> Option<&ThreadId> {
        self.active.as_ref()
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn list(&self) -> &ConversationListView {
        &self.list
    }

    pub fn chat(&self) -> &ChatView {
        &self.chat
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    pub fn refresh_conversations(&mut self) {
        let ticket = self.list.begin_refresh(&mut self.cache);
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.get_conversations().await;
            AppEvent::ConversationsLoaded { ticket, result }
        });
    }

    pub fn select_thread(&mut self, thread_id: ThreadId) {
        self.set_active(Some(thread_id));
    }

    /// Back to the empty welcome state
    pub fn new_chat(&mut self) {
        self.set_active(None);
    }

    fn set_active(&mut self, thread_id: Option<ThreadId>) {
        if self.active == thread_id && self.chat.thread_id() == thread_id.as_ref() {
            return;
        }
        tracing::debug!(thread_id = ?thread_id, "Active thread changed");
        self.active = thread_id.clone();
        if let Some(ticket) = self.chat.show_thread(thread_id, &mut self.cache) {
            self.spawn_history(ticket);
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.chat.set_input(text);
    }

    /// Send the composer's content to the active thread (or a new one)
    pub fn submit(&mut self) -> Result<(), SendRejected> {
        let pending = self.chat.begin_send()?;
        let send_id = pending.id;
        let request = pending.request;
        tracing::debug!(send_id, thread_id = ?request.thread_id, "Sending message");

        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.create_or_continue_chat(request).await;
            AppEvent::SendSettled { send_id, result }
        });
        Ok(())
    }

    pub fn start_rename(&mut self, thread_id: &ThreadId) -> bool {
        self.list.start_rename(thread_id)
    }

    pub fn edit_rename(&mut self, title: impl Into<String>) {
        self.list.edit_rename(title);
    }

    pub fn cancel_rename(&mut self) {
        self.list.cancel_rename();
    }

    /// Returns whether a rename request was issued
    pub fn confirm_rename(&mut self) -> bool {
        let Some(request) = self.list.confirm_rename() else {
            return false;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend
                .rename_conversation(&request.thread_id, &request.title)
                .await;
            AppEvent::RenameSettled {
                thread_id: request.thread_id,
                result,
            }
        });
        true
    }

    pub fn request_delete(&mut self, thread_id: &ThreadId) -> bool {
        self.list.request_delete(thread_id)
    }

    pub fn cancel_delete(&mut self) {
        self.list.cancel_delete();
    }

    /// Returns whether a delete request was issued
    pub fn confirm_delete(&mut self) -> bool {
        let Some(thread_id) = self.list.confirm_delete() else {
            return false;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.delete_conversation(&thread_id).await;
            AppEvent::DeleteSettled { thread_id, result }
        });
        true
    }

    /// Wait for the next backend result or poller tick
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    /// Apply one event to the views
    pub fn handle_event(&mut self, event: AppEvent) {
        if event.is_request() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match event {
            AppEvent::ConversationsLoaded { ticket, result } => {
                self.list.apply_refresh(&ticket, result, &self.cache);
            }
            AppEvent::HistoryLoaded { ticket, result } => {
                self.chat.apply_history(&ticket, result, &mut self.cache);
            }
            AppEvent::SendSettled { send_id, result } => {
                let effects = self.chat.complete_send(send_id, result, &mut self.cache);
                self.apply_send_effects(effects);
            }
            AppEvent::RenameSettled { thread_id, result } => {
                if result.is_ok() {
                    self.cache.invalidate_detail(&thread_id);
                }
                let effects = self.list.complete_rename(&thread_id, result);
                self.apply_list_effects(effects);
            }
            AppEvent::DeleteSettled { thread_id, result } => {
                let effects = self.list.complete_delete(
                    &thread_id,
                    result,
                    self.active.as_ref(),
                    &mut self.cache,
                );
                self.apply_list_effects(effects);
            }
            AppEvent::Health(result) => self.status.apply_health(result),
            AppEvent::Stats(result) => self.status.apply_stats(result),
        }
    }

    /// Process events until every issued request has come back
    ///
    /// Requests issued while settling (follow-up fetches) are waited for too.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    fn apply_send_effects(&mut self, effects: SendEffects) {
        if let Some(thread_id) = effects.thread_created {
            tracing::info!(thread_id = %thread_id, "New conversation created");
            self.active = Some(thread_id.clone());
            if let Some(ticket) = self.chat.adopt_thread(thread_id, &mut self.cache) {
                self.spawn_history(ticket);
            }
        } else if effects.applied {
            if let Some(ticket) = self.chat.refresh(&mut self.cache) {
                self.spawn_history(ticket);
            }
        }

        if effects.refresh_conversations {
            self.refresh_conversations();
        }
        if let Some(notification) = effects.notification {
            self.notifications.push_back(notification);
        }
    }

    fn apply_list_effects(&mut self, effects: ListEffects) {
        if effects.clear_active {
            self.new_chat();
        }
        if effects.refresh_conversations {
            self.refresh_conversations();
        }
        if let Some(notification) = effects.notification {
            self.notifications.push_back(notification);
        }
    }

    fn spawn_history(&mut self, ticket: FetchTicket) {
        let Some(thread_id) = ticket.thread_id().cloned() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        self.spawn_request(async move {
            let result = backend.get_conversation(&thread_id).await;
            AppEvent::HistoryLoaded { ticket, result }
        });
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = request.await;
            if events.send(event).await.is_err() {
                tracing::debug!("Shell closed before the request settled");
            }
        });
    }
}
