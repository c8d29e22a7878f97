/// Message store: ordered chat history of one conversation, kept in memory
/// Frugal: a deque plus an id index, no reordering ever
use crate::chat_types::{Message, MessageId};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    ids: HashSet<MessageId>,
    next_id: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id. Ids grow with creation order, whatever the position.
    pub fn next_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    /// Insert at the tail. Returns false (and does nothing) on a duplicate id.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.track(&message) {
            return false;
        }
        self.messages.push_back(message);
        true
    }

    /// Insert at the head (refresh). Returns false on a duplicate id.
    pub fn prepend(&mut self, message: Message) -> bool {
        if !self.track(&message) {
            return false;
        }
        self.messages.push_front(message);
        true
    }

    /// Apply a partial update. Unknown ids are a silent no-op (returns false).
    /// `is_read` cannot be reverted by the patcher.
    pub fn update_by_id<F>(&mut self, id: MessageId, patcher: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        let was_read = message.is_read;
        patcher(message);
        message.id = id;
        message.is_read |= was_read;
        true
    }

    /// Flip every unread remote message to read, returning the ids touched
    pub fn mark_remote_read(&mut self) -> Vec<MessageId> {
        let unread: Vec<MessageId> = self
            .messages
            .iter()
            .filter(|m| m.is_remote_unread())
            .map(|m| m.id)
            .collect();
        for id in &unread {
            self.update_by_id(*id, |m| m.is_read = true);
        }
        unread
    }

    /// Ordered copy for rendering
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn track(&mut self, message: &Message) -> bool {
        if !self.ids.insert(message.id) {
            return false;
        }
        // Keep allocation ahead of externally built ids
        self.next_id = self.next_id.max(message.id.0);
        true
    }
}
