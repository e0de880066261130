use ragchat_types::{ConversationDetail, ThreadId};
use std::collections::HashMap;

/// Identity of a server read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Conversations,
    Conversation(ThreadId),
}

/// One issued fetch. Only the newest ticket per key may apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    pub generation: u64,
}

impl FetchTicket {
    pub fn thread_id(&self) -> Option<&ThreadId> {
        match &self.key {
            QueryKey::Conversation(thread_id) => Some(thread_id),
            QueryKey::Conversations => None,
        }
    }
}

#[derive(Debug, Clone)]
struct DetailEntry {
    detail: ConversationDetail,
    stale: bool,
}

/// Client-side fetch cache
///
/// Holds conversation details already fetched, whether they are stale, and
/// the newest fetch generation issued for each key.
#[derive(Debug, Default)]
pub struct QueryCache {
    details: HashMap<ThreadId, DetailEntry>,
    latest: HashMap<QueryKey, u64>,
    next_generation: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new fetch of `key`, superseding older ones
    pub fn begin(&mut self, key: QueryKey) -> FetchTicket {
        self.next_generation += 1;
        self.latest.insert(key.clone(), self.next_generation);
        FetchTicket {
            key,
            generation: self.next_generation,
        }
    }

    pub fn is_latest(&self, ticket: &FetchTicket) -> bool {
        self.latest.get(&ticket.key) == Some(&ticket.generation)
    }

    /// Cached detail, only if it has not been invalidated
    pub fn fresh_detail(&self, thread_id: &ThreadId) -> Option<&ConversationDetail> {
        self.details
            .get(thread_id)
            .filter(|entry| !entry.stale)
            .map(|entry| &entry.detail)
    }

    pub fn store_detail(&mut self, thread_id: ThreadId, detail: ConversationDetail) {
        self.details.insert(thread_id, DetailEntry { detail, stale: false });
    }

    /// Mark a thread's detail stale so the next visit re-fetches it
    pub fn invalidate_detail(&mut self, thread_id: &ThreadId) {
        if let Some(entry) = self.details.get_mut(thread_id) {
            entry.stale = true;
        }
    }

    pub fn is_detail_stale(&self, thread_id: &ThreadId) -> bool {
        self.fresh_detail(thread_id).is_none()
    }

    /// Forget everything about a thread that no longer exists
    pub fn remove_detail(&mut self, thread_id: &ThreadId) {
        self.details.remove(thread_id);
        self.latest
            .remove(&QueryKey::Conversation(thread_id.clone()));
    }
}
