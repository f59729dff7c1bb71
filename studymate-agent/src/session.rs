//! Study session controller
//!
//! Owns one [`SessionRecord`] and every service that mutates it. Each
//! mutating operation finishes by persisting the record.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use studymate_core::account;
use studymate_core::config::Config;
use studymate_core::conversation::ConversationLog;
use studymate_core::files::FileParser;
use studymate_core::ledger::{self, RestoreOutcome, UploadGroup, UploadLedger};
use studymate_core::memory::LongTermMemory;
use studymate_core::session::{
    Message, PaymentRecord, SaveOutcome, SessionRecord, SessionStore, UploadRecord, User,
};
use studymate_core::storage::KeyValueStorage;
use studymate_core::usage::UsageCounter;
use studymate_core::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::consolidation::MemoryConsolidator;
use crate::context::ContextBuilder;
use crate::responder::{ReplyKind, Responder};

/// Placeholder shown while a reply is being generated
pub const LOADING_TEXT: &str = "Loading…";
pub const CANCELLED_TEXT: &str = "Request cancelled.";
pub const FAILED_TEXT: &str =
    "Sorry, I couldn't reach the study assistant right now. Please try again.";

/// Result of [`StudySession::send`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The placeholder was replaced by a reply
    Replied { message: Message, kind: ReplyKind },
    /// The responder failed; the placeholder now holds an error message
    Failed(Message),
    /// The request was cancelled before a reply arrived
    Cancelled,
    /// Free-tier allowance used up; nothing was appended
    LimitReached { limit: usize },
}

/// A single user's study session
pub struct StudySession {
    config: Config,
    record: SessionRecord,
    store: SessionStore,
    responder: Arc<dyn Responder>,
    consolidator: Arc<dyn MemoryConsolidator>,
    parser: FileParser,
    context: ContextBuilder,
}

impl std::fmt::Debug for StudySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudySession")
            .field("store", &self.store)
            .field("responder", &self.responder.name())
            .field("messages", &self.record.messages.len())
            .finish_non_exhaustive()
    }
}

impl StudySession {
    /// Load the stored session, or start a fresh one
    pub fn open(
        config: Config,
        storage: Arc<dyn KeyValueStorage>,
        responder: Arc<dyn Responder>,
        consolidator: Arc<dyn MemoryConsolidator>,
    ) -> Self {
        let store = SessionStore::new(storage, config.storage.key.clone());
        let record = store.load().unwrap_or_else(|| {
            info!("Starting a fresh session");
            SessionRecord::new()
        });
        info!(
            messages = record.messages.len(),
            uploads = record.user_state.upload_history.len(),
            responder = responder.name(),
            "Session opened"
        );

        Self {
            parser: FileParser::new(&config.uploads),
            context: ContextBuilder::new(config.conversation.history_window),
            config,
            record,
            store,
            responder,
            consolidator,
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn messages(&self) -> &[Message] {
        &self.record.messages
    }

    pub fn current_file(&self) -> Option<&UploadRecord> {
        self.record.current_file.as_ref()
    }

    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    /// Persist the record; never fails
    pub fn save(&self) -> SaveOutcome {
        self.store.save(&self.record)
    }

    fn usage(&mut self) -> UsageCounter<&mut Vec<DateTime<Utc>>> {
        UsageCounter::new(
            &mut self.record.user_state.question_usage,
            &self.config.usage,
        )
    }

    fn conversation(&mut self) -> ConversationLog<'_> {
        ConversationLog::new(
            &mut self.record.messages,
            self.config.conversation.consolidation_interval,
        )
    }

    fn usage_view(&self) -> UsageCounter<&[DateTime<Utc>]> {
        UsageCounter::new(
            self.record.user_state.question_usage.as_slice(),
            &self.config.usage,
        )
    }

    /// Questions left for a free-tier user; `None` when premium
    pub fn usage_remaining(&self) -> Option<usize> {
        self.usage_view().remaining(self.record.user_state.is_premium)
    }

    /// Questions asked inside the nominal window, for display
    pub fn usage_in_window(&self) -> usize {
        self.usage_view().usage_in_window(Utc::now())
    }

    /// Parse an upload, add it to the history and make it the current file.
    /// A failed or cancelled parse leaves the session unchanged.
    pub async fn upload(
        &mut self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<UploadRecord> {
        let parsed = self
            .parser
            .parse_cancellable(name.to_string(), mime.to_string(), bytes, cancel)
            .await
            .map_err(|e| {
                warn!(name, "Upload not added: {}", e);
                e
            })?;

        let record =
            UploadLedger::new(&mut self.record.user_state.upload_history).add(parsed.into_draft());
        self.record.current_file = Some(record.clone());
        info!(id = %record.id, name = %record.name, category = %record.category, "File uploaded");

        self.save();
        Ok(record)
    }

    /// Ask a question, optionally about the current file.
    ///
    /// Memory is consolidated at most once per call, after the reply lands,
    /// if either appended message hit the consolidation interval.
    pub async fn send(
        &mut self,
        text: &str,
        attach_current: bool,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }

        let is_premium = self.record.user_state.is_premium;
        {
            let mut usage = self.usage();
            if usage.is_over_limit(is_premium) {
                info!(count = usage.count(), "Free-tier limit reached");
                return Ok(SendOutcome::LimitReached {
                    limit: usage.limit(),
                });
            }
            usage.record_usage(Utc::now());
        }

        let attachment = if attach_current {
            self.record.current_file.clone()
        } else {
            None
        };
        let mut user_message = Message::user(prompt);
        if let Some(file) = &attachment {
            user_message = user_message.with_attachment(file.attachment());
        }

        let due = {
            let mut log = self.conversation();
            let first = log.append(user_message);
            log.append(Message::model(LOADING_TEXT)) || first
        };
        self.save();

        let request = self
            .context
            .build_request(&self.record, prompt, attachment, 2);
        let responder = Arc::clone(&self.responder);
        debug!(responder = responder.name(), history = request.history.len(), "Requesting reply");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            reply = responder.respond(request) => Some(reply),
        };

        let (final_message, outcome) = match result {
            None => {
                info!("Request cancelled");
                (Message::error(CANCELLED_TEXT), SendOutcome::Cancelled)
            }
            Some(Ok(reply)) => {
                let kind = reply.kind;
                let message = reply.into_message();
                (
                    message.clone(),
                    SendOutcome::Replied { message, kind },
                )
            }
            Some(Err(e)) => {
                warn!("Responder failed: {}", e);
                let message = Message::error(FAILED_TEXT);
                (message.clone(), SendOutcome::Failed(message))
            }
        };

        self.conversation().replace_last(final_message);

        if due {
            self.consolidate().await;
        }
        self.save();
        Ok(outcome)
    }

    async fn consolidate(&mut self) {
        let consolidator = Arc::clone(&self.consolidator);
        let result = consolidator
            .consolidate(
                &self.record.messages,
                &self.record.user_state.long_term_memory,
            )
            .await;
        LongTermMemory::new(&mut self.record.user_state.long_term_memory).overwrite(result);
    }

    /// Make a history entry the current file again
    pub fn restore_upload(&mut self, id: &str) -> RestoreOutcome {
        let outcome = ledger::restore(
            &self.record.user_state.upload_history,
            id,
            &mut self.record.current_file,
        );
        match outcome {
            RestoreOutcome::Restored => {
                info!(id, "Upload restored");
                self.save();
            }
            RestoreOutcome::MissingContent => {
                warn!(id, "Upload content was dropped to fit storage; upload the file again")
            }
            RestoreOutcome::NotFound => debug!(id, "No upload with that id"),
        }
        outcome
    }

    /// Remove a history entry. The current file is left alone.
    pub fn delete_upload(&mut self, id: &str) -> bool {
        let removed = UploadLedger::new(&mut self.record.user_state.upload_history).remove(id);
        if removed {
            self.save();
        }
        removed
    }

    pub fn upload_groups(&self) -> Vec<UploadGroup> {
        ledger::group_by_name(&self.record.user_state.upload_history)
    }

    pub fn clear_current_file(&mut self) {
        self.record.current_file = None;
        self.save();
    }

    /// Start a new chat; long-term memory and usage are kept
    pub fn reset_conversation(&mut self) {
        self.record.messages.clear();
        info!("Conversation reset");
        self.save();
    }

    pub fn sign_in(&mut self, name: &str, email: &str, password: &str) -> Result<User> {
        let user = account::validate_sign_in(name, email, password)?;
        info!(email = %user.email, "Signed in");
        self.record.user_state.user = Some(user.clone());
        self.save();
        Ok(user)
    }

    /// Forget the signed-in user; histories and premium status stay
    pub fn sign_out(&mut self) {
        self.record.user_state.user = None;
        self.save();
    }

    pub fn confirm_payment(
        &mut self,
        phone: &str,
        amount: f64,
        method: &str,
    ) -> Result<PaymentRecord> {
        let payment = account::validate_payment(phone, amount, method)?;
        let state = &mut self.record.user_state;
        state.payment_history.push(payment.clone());
        state.has_paid = true;
        state.is_premium = true;
        info!(id = %payment.id, amount, "Payment confirmed");
        self.save();
        Ok(payment)
    }

    pub fn record_download(&mut self, name: &str, kind: &str) {
        self.record
            .user_state
            .download_history
            .push(account::download_record(name, kind));
        self.save();
    }

    pub fn set_background(&mut self, background: Option<String>) {
        self.record.custom_background = background;
        self.save();
    }
}
