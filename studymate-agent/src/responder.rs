//! Base trait for response backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studymate_core::session::{GeneratedMedia, GroundingLink, Message, UploadRecord};
use thiserror::Error;

/// Error type for responder operations
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("backend unreachable: {0}")]
    Network(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type ResponderResult<T> = Result<T, ResponderError>;

/// Which family of answer a reply belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    General,
    Document,
    Image,
    TaskList,
    ProjectPlan,
    Media,
}

/// Everything a backend gets to answer one user message
#[derive(Debug, Clone, Default)]
pub struct ResponseRequest {
    pub prompt: String,
    /// The file the user attached to this message, if any
    pub attachment: Option<UploadRecord>,
    /// Preceding conversation, oldest first
    pub history: Vec<Message>,
    pub long_term_memory: String,
}

impl ResponseRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_attachment(mut self, attachment: UploadRecord) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// A generated answer
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
    /// Template the text was rendered from, when templated
    pub template: Option<&'static str>,
    pub generated_media: Option<GeneratedMedia>,
    pub grounding_links: Vec<GroundingLink>,
}

impl Reply {
    pub fn into_message(self) -> Message {
        let mut message = Message::model(self.text).with_grounding_links(self.grounding_links);
        if let Some(media) = self.generated_media {
            message = message.with_media(media);
        }
        message
    }
}

/// Produces the assistant side of the conversation
#[async_trait]
pub trait Responder: Send + Sync {
    /// Answer one user message
    async fn respond(&self, request: ResponseRequest) -> ResponderResult<Reply>;

    /// Short name used in logs and status output
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use studymate_core::session::{MediaKind, Role};

    #[test]
    fn test_reply_into_message_carries_media() {
        let reply = Reply {
            text: "Here is your diagram.".to_string(),
            kind: ReplyKind::Media,
            template: None,
            generated_media: Some(GeneratedMedia {
                kind: MediaKind::Image,
                url: "generated://image/1".to_string(),
                prompt: "draw a cell".to_string(),
            }),
            grounding_links: Vec::new(),
        };

        let message = reply.into_message();
        assert_eq!(message.role, Role::Model);
        assert!(!message.is_error);
        assert!(message.generated_media.is_some());
        assert!(message.grounding_links.is_none());
    }
}
