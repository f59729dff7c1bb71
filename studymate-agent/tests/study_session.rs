//! End-to-end tests for the study session controller

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studymate_agent::templated::GENERAL;
use studymate_agent::{
    MemoryConsolidator, ReplyKind, Responder, SendOutcome, StudySession, TemplatedConsolidator,
    TemplatedResponder,
};
use studymate_core::config::{Config, ResponderConfig};
use studymate_core::ledger::RestoreOutcome;
use studymate_core::session::{FileCategory, Message};
use studymate_core::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CountingConsolidator {
    calls: AtomicUsize,
}

#[async_trait]
impl MemoryConsolidator for CountingConsolidator {
    async fn consolidate(&self, messages: &[Message], _previous: &str) -> Option<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Some(format!("consolidation {} over {} messages", n, messages.len()))
    }
}

fn responder() -> Arc<dyn Responder> {
    Arc::new(TemplatedResponder::with_seed(
        &ResponderConfig { latency_ms: 0 },
        11,
    ))
}

fn open(storage: Arc<dyn KeyValueStorage>) -> StudySession {
    StudySession::open(
        Config::default(),
        storage,
        responder(),
        Arc::new(TemplatedConsolidator::default()),
    )
}

#[tokio::test]
async fn test_upload_then_ask_without_attaching() {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(dir.path()));
    let token = CancellationToken::new();

    let mut session = open(storage.clone());
    let upload = session
        .upload("notes.txt", "text/plain", b"Hello".to_vec(), &token)
        .await
        .unwrap();

    let current = session.current_file().unwrap();
    assert_eq!(current.id, upload.id);
    assert_eq!(current.category, FileCategory::Text);
    assert_eq!(current.content.as_deref(), Some("Hello"));

    let outcome = session.send("summarize", false, &token).await.unwrap();
    match outcome {
        SendOutcome::Replied { message, kind } => {
            assert_eq!(kind, ReplyKind::General);
            assert!(GENERAL.contains(&message.text.as_str()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    // everything survives a restart
    let reopened = open(storage);
    assert_eq!(reopened.record(), session.record());
}

#[tokio::test]
async fn test_attached_question_uses_the_file() {
    let mut session = open(Arc::new(MemoryStorage::new()));
    let token = CancellationToken::new();
    session
        .upload("notes.txt", "text/plain", b"Hello".to_vec(), &token)
        .await
        .unwrap();

    let outcome = session.send("explain this", true, &token).await.unwrap();
    assert!(matches!(outcome, SendOutcome::Replied { kind: ReplyKind::Document, .. }));

    let question = &session.messages()[0];
    assert_eq!(question.attachment.as_ref().unwrap().name, "notes.txt");
    assert!(session.messages()[1].text.contains("notes.txt"));
}

#[tokio::test]
async fn test_consolidation_runs_every_fifth_message() {
    let counter = Arc::new(CountingConsolidator::default());
    let mut session = StudySession::open(
        Config::default(),
        Arc::new(MemoryStorage::new()),
        responder(),
        counter.clone(),
    );
    let token = CancellationToken::new();

    // two messages per exchange: the 5th lands in the third exchange
    let mut calls_after = Vec::new();
    for i in 0..5 {
        session.send(&format!("question {}", i), false, &token).await.unwrap();
        calls_after.push(counter.calls.load(Ordering::SeqCst));
    }

    assert_eq!(calls_after, vec![0, 0, 1, 1, 2]);
    assert_eq!(
        session.record().user_state.long_term_memory,
        "consolidation 2 over 10 messages"
    );
}

#[tokio::test]
async fn test_consolidation_runs_once_per_send_at_interval_one() {
    let mut config = Config::default();
    config.conversation.consolidation_interval = 1;
    let counter = Arc::new(CountingConsolidator::default());
    let mut session = StudySession::open(
        config,
        Arc::new(MemoryStorage::new()),
        responder(),
        counter.clone(),
    );
    let token = CancellationToken::new();

    for _ in 0..3 {
        session.send("hello", false, &token).await.unwrap();
    }

    assert_eq!(counter.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        session.record().user_state.long_term_memory,
        "consolidation 3 over 6 messages"
    );
}

#[tokio::test]
async fn test_free_tier_gate() {
    let mut session = open(Arc::new(MemoryStorage::new()));
    let token = CancellationToken::new();

    for i in 0..5 {
        let outcome = session.send(&format!("q{}", i), false, &token).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Replied { .. }));
    }
    let len = session.messages().len();
    let outcome = session.send("q5", false, &token).await.unwrap();

    assert_eq!(outcome, SendOutcome::LimitReached { limit: 5 });
    assert_eq!(session.messages().len(), len);
    assert_eq!(session.record().user_state.question_usage.len(), 5);
}

#[tokio::test]
async fn test_degraded_history_cannot_be_restored() {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::with_quota(4096));
    let token = CancellationToken::new();

    let mut session = open(storage.clone());
    let image = session
        .upload("diagram.png", "image/png", vec![7u8; 3000], &token)
        .await
        .unwrap();
    session
        .upload("notes.txt", "text/plain", b"Hello".to_vec(), &token)
        .await
        .unwrap();

    // the in-memory copy still has the payload
    assert_eq!(session.restore_upload(&image.id), RestoreOutcome::Restored);
    session.clear_current_file();

    let mut reopened = open(storage);
    let stored = reopened
        .record()
        .user_state
        .upload_history
        .iter()
        .find(|r| r.id == image.id)
        .unwrap();
    assert!(stored.content.is_none());
    assert_eq!(
        reopened.restore_upload(&image.id),
        RestoreOutcome::MissingContent
    );
    assert!(reopened.current_file().is_none());
}

#[tokio::test]
async fn test_versions_group_and_delete() {
    let mut session = open(Arc::new(MemoryStorage::new()));
    let token = CancellationToken::new();

    let first = session
        .upload("essay.txt", "text/plain", b"draft one".to_vec(), &token)
        .await
        .unwrap();
    let second = session
        .upload("essay.txt", "text/plain", b"draft two".to_vec(), &token)
        .await
        .unwrap();

    let groups = session.upload_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].versions.len(), 2);

    assert!(session.delete_upload(&first.id));
    assert!(!session.delete_upload(&first.id));
    assert_eq!(session.current_file().unwrap().id, second.id);
    assert_eq!(session.upload_groups()[0].versions.len(), 1);
}

#[tokio::test]
async fn test_failed_upload_leaves_state_untouched() {
    let mut session = open(Arc::new(MemoryStorage::new()));
    let err = session
        .upload(
            "setup.exe",
            "application/x-msdownload",
            b"MZ".to_vec(),
            &CancellationToken::new(),
        )
        .await;

    assert!(err.is_err());
    assert!(session.current_file().is_none());
    assert!(session.record().user_state.upload_history.is_empty());
}
