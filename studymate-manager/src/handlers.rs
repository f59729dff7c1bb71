use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::oneshot;

use crate::state::{AppState, AskError, AskRequest, AskResponse, ErrorResponse, ManagerCommand};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /api/ask` with multipart fields `image` and `question`
pub async fn ask_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, String, Vec<u8>)> = None;
    let mut question: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed multipart body: {}", e);
                return error_response(StatusCode::BAD_REQUEST, format!("malformed form data: {}", e));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, mime_type, bytes.to_vec())),
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("unreadable image field: {}", e),
                        )
                    }
                }
            }
            "question" => match field.text().await {
                Ok(text) => question = Some(text),
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("unreadable question field: {}", e),
                    )
                }
            },
            other => tracing::debug!("Ignoring form field {}", other),
        }
    }

    let Some((file_name, mime_type, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "missing image field");
    };
    let question = match question {
        Some(q) if !q.trim().is_empty() => q,
        _ => return error_response(StatusCode::BAD_REQUEST, "missing question field"),
    };

    tracing::info!(file = %file_name, size = bytes.len(), "Received ask request");

    let (reply_tx, reply_rx) = oneshot::channel();
    let req = AskRequest {
        file_name,
        mime_type,
        bytes,
        question,
        reply_tx,
    };
    if let Err(e) = state.api_tx.send(ManagerCommand::Ask(req)).await {
        tracing::error!("Failed to send ask request to manager: {}", e);
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "assistant unavailable");
    }

    match reply_rx.await {
        Ok(Ok(answer)) => Json(AskResponse {
            success: true,
            answer,
        })
        .into_response(),
        Ok(Err(e @ AskError::Parse(_))) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Ok(Err(e @ AskError::Backend(_))) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        Err(e) => {
            tracing::error!("Failed to receive ask response: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "assistant unavailable")
        }
    }
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
