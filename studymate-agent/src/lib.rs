//! Response generation and session orchestration for studymate
//!
//! This crate provides the responder backends, memory consolidation, and
//! the [`StudySession`] controller that ties them to the persisted record.

pub mod consolidation;
pub mod context;
pub mod responder;
pub mod session;
pub mod templated;

pub use consolidation::{MemoryConsolidator, TemplatedConsolidator};
pub use context::ContextBuilder;
pub use responder::{Reply, ReplyKind, Responder, ResponderError, ResponderResult, ResponseRequest};
pub use session::{SendOutcome, StudySession};
pub use templated::TemplatedResponder;
