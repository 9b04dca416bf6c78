use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Sorted pair of usernames: one conversation per pair, addressable from
/// either side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(String, String);

impl ConversationKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_owned(), b.to_owned())
        } else {
            Self(b.to_owned(), a.to_owned())
        }
    }
}

/// A stored message; also the wire payload of `new_message` and `history`.
/// Immutable once appended, except `delivered`, which is flipped at most
/// once within the send that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub username: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub unread: bool,
    pub delivered: bool,
}

/// Append-only per-pair message history, kept for the process lifetime.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<Mutex<HashMap<ConversationKey, Vec<Message>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Appends under the canonical key, creating the conversation on first
    /// use. Returns the message's index within its conversation, so the
    /// caller can mark exactly this message delivered even when sends on the
    /// same pair interleave.
    pub fn append(&self, a: &str, b: &str, message: Message) -> usize {
        let mut conversations = self.inner.lock();
        let messages = conversations.entry(ConversationKey::new(a, b)).or_default();
        messages.push(message);
        messages.len() - 1
    }

    pub fn mark_delivered(&self, a: &str, b: &str, index: usize) {
        let mut conversations = self.inner.lock();
        if let Some(message) = conversations
            .get_mut(&ConversationKey::new(a, b))
            .and_then(|messages| messages.get_mut(index))
        {
            message.delivered = true;
        }
    }

    /// Full chronological history for the pair, empty if they never talked.
    pub fn history(&self, a: &str, b: &str) -> Vec<Message> {
        self.inner
            .lock()
            .get(&ConversationKey::new(a, b))
            .cloned()
            .unwrap_or_default()
    }
}
