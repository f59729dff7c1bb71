//! Upload parsing
//!
//! Dispatches on MIME type (falling back to the file extension) to a
//! decoder that turns the raw bytes into the content stored with the
//! upload: extracted text for documents, a base64 data URL for media.

pub mod docx;
pub mod pdf;

use base64::Engine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::UploadsConfig;
use crate::ledger::UploadDraft;
use crate::session::FileCategory;
use crate::utils::extension_of;
use crate::{Error, Result};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Decoded upload, ready to be recorded in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub category: FileCategory,
    pub content: String,
    pub original_image: Option<String>,
}

impl ParsedFile {
    pub fn into_draft(self) -> UploadDraft {
        UploadDraft {
            name: self.name,
            mime_type: self.mime_type,
            size: self.size,
            content: Some(self.content),
            category: self.category,
            original_image: self.original_image,
        }
    }
}

/// Resolve the effective MIME type: the reported one unless it is empty or
/// generic, otherwise a guess from the extension.
pub fn effective_mime(name: &str, reported: &str) -> String {
    let reported = reported.trim();
    if !reported.is_empty() && reported != "application/octet-stream" {
        return reported.to_ascii_lowercase();
    }
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Pick the category for an upload, or `None` when unsupported
pub fn detect_category(name: &str, mime: &str) -> Option<FileCategory> {
    let ext = extension_of(name);
    match (mime, ext.as_deref()) {
        ("application/pdf", _) | (_, Some("pdf")) => Some(FileCategory::Pdf),
        (DOCX_MIME, _) | (_, Some("docx")) => Some(FileCategory::Docx),
        (m, _) if m.starts_with("image/") => Some(FileCategory::Image),
        (m, _) if m.starts_with("video/") => Some(FileCategory::Video),
        (m, _) if m.starts_with("text/") => Some(FileCategory::Text),
        (_, Some("txt" | "md" | "csv")) => Some(FileCategory::Text),
        _ => None,
    }
}

/// Turns uploaded bytes into [`ParsedFile`]s
#[derive(Debug, Clone)]
pub struct FileParser {
    max_file_bytes: u64,
}

impl Default for FileParser {
    fn default() -> Self {
        Self::new(&UploadsConfig::default())
    }
}

impl FileParser {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
        }
    }

    /// Decode `bytes` uploaded as `name` with reported MIME type `mime`
    pub fn parse(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<ParsedFile> {
        let size = bytes.len() as u64;
        if size > self.max_file_bytes {
            return Err(Error::Validation(format!(
                "{} is {} bytes, the upload limit is {}",
                name, size, self.max_file_bytes
            )));
        }

        let mime_type = effective_mime(name, mime);
        let category = detect_category(name, &mime_type).ok_or_else(|| {
            warn!(name, mime = %mime_type, "Unsupported upload type");
            Error::parse(name, format!("unsupported file type {}", mime_type))
        })?;
        debug!(name, mime = %mime_type, %category, size, "Parsing upload");

        let (content, original_image) = match category {
            FileCategory::Pdf => (pdf::extract_text(bytes).map_err(|e| Error::parse(name, e))?, None),
            FileCategory::Docx => (docx::extract_text(bytes).map_err(|e| Error::parse(name, e))?, None),
            FileCategory::Text => (String::from_utf8_lossy(bytes).into_owned(), None),
            FileCategory::Image => {
                let url = data_url(&mime_type, bytes);
                (url.clone(), Some(url))
            }
            FileCategory::Video => (data_url(&mime_type, bytes), None),
        };

        Ok(ParsedFile {
            name: name.to_string(),
            mime_type,
            size,
            category,
            content,
            original_image,
        })
    }

    /// [`parse`](Self::parse) on a blocking worker, abandoned when `cancel`
    /// fires. A cancelled parse leaves no trace.
    pub async fn parse_cancellable(
        &self,
        name: String,
        mime: String,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<ParsedFile> {
        let parser = self.clone();
        let task = tokio::task::spawn_blocking(move || parser.parse(&name, &mime, &bytes));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            joined = task => joined.map_err(|e| Error::Internal(format!("parse task failed: {}", e)))?,
        }
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
