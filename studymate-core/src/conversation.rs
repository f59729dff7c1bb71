//! Conversation log
//!
//! Ordered, append-only message list. Only the newest entry may be
//! replaced, which supports the "loading placeholder then result" pattern.
//! Every `interval` appended messages the log reports that long-term memory
//! should be consolidated.

use tracing::{debug, warn};

use crate::session::Message;

/// Mutable view over the messages of a session
#[derive(Debug)]
pub struct ConversationLog<'a> {
    messages: &'a mut Vec<Message>,
    interval: usize,
}

impl<'a> ConversationLog<'a> {
    pub fn new(messages: &'a mut Vec<Message>, consolidation_interval: usize) -> Self {
        Self {
            messages,
            interval: consolidation_interval.max(1),
        }
    }

    /// Push `message`. Returns `true` when memory consolidation is due.
    pub fn append(&mut self, message: Message) -> bool {
        self.messages.push(message);
        let due = self.messages.len() % self.interval == 0;
        if due {
            debug!(len = self.messages.len(), "Memory consolidation due");
        }
        due
    }

    /// Swap the newest entry for `message`; `false` on an empty log
    pub fn replace_last(&mut self, message: Message) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                *last = message;
                true
            }
            None => {
                warn!("replace_last on an empty conversation");
                false
            }
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    /// The trailing `max_messages` entries
    pub fn history(&self, max_messages: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(max_messages);
        &self.messages[start..]
    }
}
