use std::collections::HashSet;

use campus_types::{Message, MessageId};

/// Append-only, duplicate-free message list for the active channel.
///
/// Order is arrival order. Nothing is ever re-sorted: history comes back in
/// server order and pushes for a channel are delivered in send order.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a history batch. Later copies of an id
    /// already present in the batch are dropped.
    pub fn replace(&mut self, history: Vec<Message>) {
        self.clear();
        for message in history {
            self.push(message);
        }
    }

    /// Append `message` unless its id is already present. Returns whether it
    /// was appended.
    pub fn push(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
