//! Context builder for assembling responder requests

use studymate_core::memory::context_block;
use studymate_core::session::{SessionRecord, UploadRecord};

use crate::responder::ResponseRequest;

/// Builds the context handed to a [`Responder`](crate::Responder)
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    history_window: usize,
}

impl ContextBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Build the request for `prompt`.
    ///
    /// History is the tail of the conversation before the exchange being
    /// answered, so the caller passes how many trailing messages to skip
    /// (the user message and its placeholder).
    pub fn build_request(
        &self,
        record: &SessionRecord,
        prompt: &str,
        attachment: Option<UploadRecord>,
        skip_trailing: usize,
    ) -> ResponseRequest {
        let end = record.messages.len().saturating_sub(skip_trailing);
        let start = end.saturating_sub(self.history_window);

        ResponseRequest {
            prompt: prompt.to_string(),
            attachment,
            history: record.messages[start..end].to_vec(),
            long_term_memory: context_block(&record.user_state.long_term_memory),
        }
    }
}
