//! Long-term memory
//!
//! A free-text summary regenerated from the conversation every few
//! messages and handed to the responder as extra context.

use tracing::debug;

/// Mutable view over the `longTermMemory` string of a session
#[derive(Debug)]
pub struct LongTermMemory<'a> {
    content: &'a mut String,
}

impl<'a> LongTermMemory<'a> {
    pub fn new(content: &'a mut String) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Apply a consolidation result. `None` keeps the previous memory.
    /// Returns whether the memory changed.
    pub fn overwrite(&mut self, consolidated: Option<String>) -> bool {
        match consolidated {
            Some(text) if *self.content != text => {
                debug!(chars = text.len(), "Long-term memory updated");
                *self.content = text;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }

    /// Prompt block for the responder; empty when there is nothing to say
    pub fn as_context(&self) -> String {
        context_block(self.content.as_str())
    }
}

/// Format `memory` as a prompt block, or an empty string when blank
pub fn context_block(memory: &str) -> String {
    if memory.trim().is_empty() {
        String::new()
    } else {
        format!("## Long-term Memory\n{}", memory.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_replaces_content() {
        let mut content = "old".to_string();
        let mut memory = LongTermMemory::new(&mut content);
        assert!(memory.overwrite(Some("new".to_string())));
        assert_eq!(memory.content(), "new");
    }

    #[test]
    fn test_overwrite_none_keeps_content() {
        let mut content = "old".to_string();
        let mut memory = LongTermMemory::new(&mut content);
        assert!(!memory.overwrite(None));
        assert_eq!(memory.content(), "old");
    }

    #[test]
    fn test_context_block() {
        let mut content = String::new();
        let mut memory = LongTermMemory::new(&mut content);
        assert!(memory.is_empty());
        assert_eq!(memory.as_context(), "");

        memory.overwrite(Some("Studies organic chemistry".to_string()));
        let context = memory.as_context();
        assert!(context.contains("Long-term Memory"));
        assert!(context.contains("organic chemistry"));
    }
}
