//! Persisted session state
//!
//! The whole durable client state is a single [`SessionRecord`] written to
//! one storage slot as a versioned JSON envelope.

pub mod migration;
pub mod record;
pub mod store;

pub use migration::CURRENT_SCHEMA_VERSION;
pub use record::{
    Attachment, DownloadRecord, FileCategory, GeneratedMedia, GroundingLink, MediaKind, Message,
    PaymentRecord, Role, SessionRecord, UploadRecord, User, UserState,
};
pub use store::{SaveOutcome, SessionStore};
