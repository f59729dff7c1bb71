use chrono::Utc;
use std::sync::Arc;
use studymate_agent::{Responder, ResponseRequest};
use studymate_core::files::FileParser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{AppState, AskError, AskRequest, ManagerCommand};

/// Serves commands coming from the HTTP handlers
pub struct Manager {
    api_rx: mpsc::Receiver<ManagerCommand>,
    responder: Arc<dyn Responder>,
    parser: FileParser,
}

impl Manager {
    pub fn new(
        api_rx: mpsc::Receiver<ManagerCommand>,
        responder: Arc<dyn Responder>,
        parser: FileParser,
    ) -> Self {
        Self {
            api_rx,
            responder,
            parser,
        }
    }

    /// Create a manager together with the handler state that feeds it
    pub fn channel(
        responder: Arc<dyn Responder>,
        parser: FileParser,
        max_body_bytes: usize,
    ) -> (AppState, Self) {
        let (api_tx, api_rx) = mpsc::channel(32);
        let state = AppState {
            api_tx,
            max_body_bytes,
        };
        (state, Self::new(api_rx, responder, parser))
    }

    pub async fn run(mut self) {
        info!(responder = self.responder.name(), "Manager loop started");

        while let Some(cmd) = self.api_rx.recv().await {
            match cmd {
                ManagerCommand::Ask(req) => {
                    debug!(file = %req.file_name, "Processing ask request");
                    let responder = Arc::clone(&self.responder);
                    let parser = self.parser.clone();
                    tokio::spawn(handle_ask(responder, parser, req));
                }
            }
        }

        info!("Manager channel closed, stopping loop");
    }
}

async fn handle_ask(responder: Arc<dyn Responder>, parser: FileParser, req: AskRequest) {
    let AskRequest {
        file_name,
        mime_type,
        bytes,
        question,
        mut reply_tx,
    } = req;

    // the client hanging up abandons the work
    let cancel = CancellationToken::new();
    let result = tokio::select! {
        biased;
        _ = reply_tx.closed() => None,
        result = answer(responder.as_ref(), &parser, file_name, mime_type, bytes, question, &cancel) => Some(result),
    };

    match result {
        Some(result) => {
            if reply_tx.send(result).is_err() {
                debug!("Ask client went away before the answer was sent");
            }
        }
        None => {
            cancel.cancel();
            debug!("Ask request abandoned by client");
        }
    }
}

async fn answer(
    responder: &dyn Responder,
    parser: &FileParser,
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
    question: String,
    cancel: &CancellationToken,
) -> Result<String, AskError> {
    let parsed = parser
        .parse_cancellable(file_name, mime_type, bytes, cancel)
        .await
        .map_err(|e| {
            warn!("Ask upload rejected: {}", e);
            AskError::Parse(e.to_string())
        })?;

    let attachment = parsed.into_draft().into_record(Utc::now());
    let request = ResponseRequest::new(question).with_attachment(attachment);

    let reply = responder.respond(request).await.map_err(|e| {
        warn!("Ask responder failed: {}", e);
        AskError::Backend(e.to_string())
    })?;
    Ok(reply.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use studymate_agent::TemplatedResponder;
    use studymate_core::config::ResponderConfig;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_manager_answers_ask() {
        let responder = Arc::new(TemplatedResponder::new(&ResponderConfig { latency_ms: 0 }));
        let (state, manager) = Manager::channel(responder, FileParser::default(), 1024);
        tokio::spawn(manager.run());

        let (reply_tx, reply_rx) = oneshot::channel();
        state
            .api_tx
            .send(ManagerCommand::Ask(AskRequest {
                file_name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                bytes: b"Hello".to_vec(),
                question: "explain".to_string(),
                reply_tx,
            }))
            .await
            .unwrap();

        let answer = reply_rx.await.unwrap().unwrap();
        assert!(answer.contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_parse_error() {
        let responder = Arc::new(TemplatedResponder::new(&ResponderConfig { latency_ms: 0 }));
        let result = answer(
            responder.as_ref(),
            &FileParser::default(),
            "setup.exe".to_string(),
            "application/x-msdownload".to_string(),
            b"MZ".to_vec(),
            "what is this".to_string(),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(AskError::Parse(_))));
    }
}
