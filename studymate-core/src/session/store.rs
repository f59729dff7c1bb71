//! Session persistence with quota-overflow fallback

use std::sync::Arc;
use tracing::{debug, error, warn};

use super::migration;
use super::record::SessionRecord;
use crate::storage::KeyValueStorage;

/// What happened to a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The full record was written
    Saved,
    /// The quota was hit and a reduced copy was written instead
    Degraded,
    /// Nothing was written; the previous value is still in place
    Dropped,
}

/// Reads and writes the session record to a single storage key.
///
/// Never fails towards its caller: write problems degrade or drop the
/// write, read problems look like a fresh session.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store writing under `key`
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored record; `None` means "start fresh"
    pub fn load(&self) -> Option<SessionRecord> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored session");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, "Failed to read stored session: {}", e);
                return None;
            }
        };

        match migration::decode(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, "Discarding unreadable session: {}", e);
                None
            }
        }
    }

    /// Persist `record`, retrying once with a degraded copy on quota overflow
    pub fn save(&self, record: &SessionRecord) -> SaveOutcome {
        let err = match self.write(record) {
            Ok(()) => return SaveOutcome::Saved,
            Err(e) => e,
        };

        if !err.is_quota_exceeded() {
            error!(key = %self.key, "Failed to save session: {}", err);
            return SaveOutcome::Dropped;
        }

        warn!(
            key = %self.key,
            "Session exceeds storage quota ({}), dropping historical upload payloads",
            err
        );
        match self.write(&record.degraded()) {
            Ok(()) => SaveOutcome::Degraded,
            Err(e) => {
                warn!(key = %self.key, "Degraded session still not saved: {}", e);
                SaveOutcome::Dropped
            }
        }
    }

    /// Remove the stored record
    pub fn clear(&self) -> bool {
        match self.storage.remove(&self.key) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %self.key, "Failed to clear session: {}", e);
                false
            }
        }
    }

    fn write(&self, record: &SessionRecord) -> Result<(), WriteError> {
        let raw = migration::encode(record).map_err(|e| WriteError::Encode(e.to_string()))?;
        self.storage
            .set(&self.key, &raw)
            .map_err(WriteError::Storage)
    }
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error(transparent)]
    Storage(crate::storage::StorageError),
}

impl WriteError {
    fn is_quota_exceeded(&self) -> bool {
        matches!(self, WriteError::Storage(e) if e.is_quota_exceeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::record::{FileCategory, Message, UploadRecord};
    use crate::storage::{FileStorage, MemoryStorage};
    use chrono::Utc;
    use tempfile::TempDir;

    const KEY: &str = "studymate.session";

    fn upload(id: &str, name: &str, payload: usize) -> UploadRecord {
        UploadRecord {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: payload as u64,
            date: Utc::now(),
            content: Some("x".repeat(payload)),
            category: FileCategory::Text,
            original_image: None,
        }
    }

    fn heavy_record() -> SessionRecord {
        let mut record = SessionRecord::new();
        let current = upload("current", "notes.txt", 200);
        record.user_state.upload_history = vec![
            upload("old-1", "essay.txt", 4_000),
            upload("old-2", "essay.txt", 4_000),
            current.clone(),
        ];
        record.current_file = Some(current);
        record.messages.push(Message::user("summarize"));
        record
    }

    fn encoded_len(record: &SessionRecord) -> u64 {
        migration::encode(record).unwrap().len() as u64
    }

    #[test]
    fn test_load_missing_key_is_fresh_session() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), KEY);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_garbage_is_fresh_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw(KEY, "{not json");
        let store = SessionStore::new(storage, KEY);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_returns_last_saved_record() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), KEY);

        let mut record = SessionRecord::new();
        for i in 0..6 {
            record.messages.push(Message::user(format!("question {}", i)));
            record.user_state.question_usage.push(Utc::now());
            assert_eq!(store.save(&record), SaveOutcome::Saved);
            assert_eq!(store.load().as_ref(), Some(&record));
        }
    }

    #[test]
    fn test_quota_overflow_saves_degraded_copy() {
        let record = heavy_record();
        let quota = encoded_len(&record.degraded()) + 16;
        assert!(encoded_len(&record) > quota);

        let store = SessionStore::new(Arc::new(MemoryStorage::with_quota(quota)), KEY);
        assert_eq!(store.save(&record), SaveOutcome::Degraded);

        let loaded = store.load().unwrap();
        assert_eq!(loaded, record.degraded());
        assert_eq!(loaded.current_file, record.current_file);
        assert_eq!(loaded.messages, record.messages);
        let history = &loaded.user_state.upload_history;
        assert!(history[0].content.is_none());
        assert!(history[1].content.is_none());
        assert!(history[2].content.is_some());
    }

    #[test]
    fn test_repeated_overflow_drops_write_and_keeps_previous() {
        let storage = Arc::new(MemoryStorage::with_quota(600));
        let store = SessionStore::new(storage, KEY);

        let small = SessionRecord::new();
        assert_eq!(store.save(&small), SaveOutcome::Saved);

        let mut huge = heavy_record();
        huge.messages.push(Message::model("y".repeat(10_000)));
        assert_eq!(store.save(&huge), SaveOutcome::Dropped);

        assert_eq!(store.load(), Some(small));
    }

    #[test]
    fn test_file_backed_roundtrip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(temp_dir.path()).with_quota(1024 * 1024));
        let store = SessionStore::new(storage, KEY);

        let record = heavy_record();
        assert_eq!(store.save(&record), SaveOutcome::Saved);
        assert_eq!(store.load(), Some(record));

        assert!(store.clear());
        assert!(store.load().is_none());
    }
}
