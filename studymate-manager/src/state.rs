use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct AppState {
    pub api_tx: mpsc::Sender<ManagerCommand>,
    /// Largest request body accepted by `/api/ask`
    pub max_body_bytes: usize,
}

pub enum ManagerCommand {
    Ask(AskRequest),
}

/// One question about one uploaded file
pub struct AskRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub question: String,
    pub reply_tx: oneshot::Sender<Result<String, AskError>>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AskError {
    /// The uploaded file could not be decoded
    #[error("failed to parse upload: {0}")]
    Parse(String),

    /// The responder failed
    #[error("failed to generate an answer: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
