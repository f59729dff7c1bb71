//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted blob holding all durable client state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub user_state: UserState,
    /// The active file context the assistant talks about
    #[serde(default)]
    pub current_file: Option<UploadRecord>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub custom_background: Option<String>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this record with the heavy payloads of historical uploads
    /// cleared. The current file, messages and user fields are kept as-is.
    pub fn degraded(&self) -> Self {
        let current_id = self.current_file.as_ref().map(|f| f.id.as_str());
        let mut copy = self.clone();
        for record in &mut copy.user_state.upload_history {
            if Some(record.id.as_str()) != current_id {
                record.strip_payload();
            }
        }
        copy
    }
}

/// Account, billing and history state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub has_paid: bool,
    #[serde(default)]
    pub payment_history: Vec<PaymentRecord>,
    #[serde(default)]
    pub download_history: Vec<DownloadRecord>,
    #[serde(default)]
    pub upload_history: Vec<UploadRecord>,
    /// One timestamp per admitted free-tier request
    #[serde(default)]
    pub question_usage: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub long_term_memory: String,
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub phone: String,
    pub amount: f64,
    pub method: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub date: DateTime<Utc>,
}

/// Broad kind of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Pdf,
    Docx,
    Text,
    Image,
    Video,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Pdf => "pdf",
            FileCategory::Docx => "docx",
            FileCategory::Text => "text",
            FileCategory::Image => "image",
            FileCategory::Video => "video",
        }
    }

    /// Whether the content is extracted text rather than an encoded binary
    pub fn is_document(&self) -> bool {
        matches!(
            self,
            FileCategory::Pdf | FileCategory::Docx | FileCategory::Text
        )
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the upload history. Entries sharing a `name` are versions
/// of the same file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub name: String,
    /// MIME type as reported at upload time
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    pub date: DateTime<Utc>,
    /// Extracted text or data URL; cleared when storage runs out of room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub category: FileCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
}

impl UploadRecord {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Drop the content and image payloads, keeping the metadata
    pub fn strip_payload(&mut self) {
        self.content = None;
        self.original_image = None;
    }

    pub fn attachment(&self) -> Attachment {
        Attachment {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            category: self.category,
        }
    }
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// File metadata shown next to a user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub category: FileCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// Media produced by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMedia {
    pub kind: MediaKind,
    pub url: String,
    pub prompt: String,
}

/// A conversation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_links: Option<Vec<GroundingLink>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_media: Option<GeneratedMedia>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            attachment: None,
            grounding_links: None,
            is_error: false,
            generated_media: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// A model message flagged as an error
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Model, text)
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_media(mut self, media: GeneratedMedia) -> Self {
        self.generated_media = Some(media);
        self
    }

    pub fn with_grounding_links(mut self, links: Vec<GroundingLink>) -> Self {
        if !links.is_empty() {
            self.grounding_links = Some(links);
        }
        self
    }
}
