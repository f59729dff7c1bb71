//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for studymate
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Persisted session storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// Free-tier usage gating
    #[serde(default)]
    pub usage: UsageConfig,
    /// Conversation log behaviour
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Templated responder settings
    #[serde(default)]
    pub responder: ResponderConfig,
    /// Upload limits
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// HTTP ask endpoint
    #[serde(default)]
    pub server: ServerConfig,
    /// External AI backend credentials
    #[serde(default)]
    pub backend: BackendConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Where and how the session record is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per storage key
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    /// Key the session record is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Byte quota for a single stored value (0 disables the check)
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_storage_dir() -> String {
    "~/.studymate/storage".to_string()
}

fn default_storage_key() -> String {
    "studymate.session".to_string()
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            key: default_storage_key(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

/// Free-tier usage gating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Requests allowed before premium gating kicks in
    #[serde(default = "default_free_tier_limit")]
    pub free_tier_limit: usize,
    /// Nominal rate-limit window in seconds (reported only, never evicts)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_free_tier_limit() -> usize {
    5
}

fn default_window_secs() -> u64 {
    60 * 60
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            free_tier_limit: default_free_tier_limit(),
            window_secs: default_window_secs(),
        }
    }
}

/// Conversation log behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Consolidate long-term memory every N appended messages; at most once
    /// per exchange
    #[serde(default = "default_consolidation_interval")]
    pub consolidation_interval: usize,
    /// Number of trailing messages handed to the responder
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_consolidation_interval() -> usize {
    5
}

fn default_history_window() -> usize {
    20
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            consolidation_interval: default_consolidation_interval(),
            history_window: default_history_window(),
        }
    }
}

/// Templated responder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Simulated generation latency in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_latency_ms() -> u64 {
    1200
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
        }
    }
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Largest accepted upload in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_max_file_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// HTTP ask endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// External AI backend credentials. Not validated at startup; a missing
/// key only surfaces on the first backend call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "templated".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
        }
    }
}
