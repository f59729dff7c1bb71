//! Core types and services for studymate
//!
//! This crate owns the durable side of a study session: the persisted
//! session record, its storage backends, the upload history ledger, the
//! usage counter, the conversation log and file parsing.

pub mod account;
pub mod config;
pub mod conversation;
pub mod error;
pub mod files;
pub mod ledger;
pub mod logging;
pub mod memory;
pub mod session;
pub mod storage;
pub mod usage;
pub mod utils;

pub use error::{Error, Result};
