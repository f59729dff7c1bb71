//! Long-term memory consolidation

use async_trait::async_trait;
use studymate_core::session::{Message, Role};
use studymate_core::utils::truncate;

/// Condenses the conversation into the long-term memory text.
///
/// Returning `None` leaves the previous memory untouched.
#[async_trait]
pub trait MemoryConsolidator: Send + Sync {
    async fn consolidate(&self, messages: &[Message], previous: &str) -> Option<String>;
}

/// Summarizes recent user questions and discussed files without a backend
#[derive(Debug, Clone)]
pub struct TemplatedConsolidator {
    max_topics: usize,
}

impl Default for TemplatedConsolidator {
    fn default() -> Self {
        Self { max_topics: 5 }
    }
}

impl TemplatedConsolidator {
    pub fn new(max_topics: usize) -> Self {
        Self {
            max_topics: max_topics.max(1),
        }
    }
}

#[async_trait]
impl MemoryConsolidator for TemplatedConsolidator {
    async fn consolidate(&self, messages: &[Message], _previous: &str) -> Option<String> {
        let questions: Vec<String> = messages
            .iter()
            .filter(|m| m.role == Role::User && !m.text.trim().is_empty())
            .map(|m| truncate(m.text.trim(), 60))
            .collect();
        if questions.is_empty() {
            return None;
        }

        let start = questions.len().saturating_sub(self.max_topics);
        let mut summary = format!(
            "The student has recently asked about: {}.",
            questions[start..].join("; ")
        );

        let mut files: Vec<&str> = Vec::new();
        for name in messages
            .iter()
            .filter_map(|m| m.attachment.as_ref().map(|a| a.name.as_str()))
        {
            if !files.contains(&name) {
                files.push(name);
            }
        }
        if !files.is_empty() {
            summary.push_str(&format!(" Files discussed: {}.", files.join(", ")));
        }

        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studymate_core::session::{Attachment, FileCategory};

    #[tokio::test]
    async fn test_summarizes_recent_questions() {
        let consolidator = TemplatedConsolidator::new(2);
        let messages = vec![
            Message::user("what is osmosis"),
            Message::model("Osmosis is..."),
            Message::user("and diffusion?"),
            Message::user("explain ATP").with_attachment(Attachment {
                name: "bio.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                category: FileCategory::Pdf,
            }),
        ];

        let memory = consolidator.consolidate(&messages, "").await.unwrap();
        assert!(!memory.contains("osmosis"));
        assert!(memory.contains("and diffusion?; explain ATP"));
        assert!(memory.ends_with("Files discussed: bio.pdf."));
    }

    #[tokio::test]
    async fn test_nothing_to_summarize() {
        let consolidator = TemplatedConsolidator::default();
        let messages = vec![Message::model("Hi there")];
        assert!(consolidator.consolidate(&messages, "old").await.is_none());
    }
}
