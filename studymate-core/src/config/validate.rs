//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.storage.dir.trim().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }
    if config.storage.key.trim().is_empty() {
        errors.push("storage.key must not be empty".to_string());
    }
    if config.usage.free_tier_limit == 0 {
        errors.push("usage.free_tier_limit must be > 0".to_string());
    }
    if config.conversation.consolidation_interval == 0 {
        errors.push("conversation.consolidation_interval must be > 0".to_string());
    }
    if config.conversation.history_window == 0 {
        errors.push("conversation.history_window must be > 0".to_string());
    }
    if config.uploads.max_file_bytes == 0 {
        errors.push("uploads.max_file_bytes must be > 0".to_string());
    }
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if !matches!(
        config.logging.format.to_ascii_lowercase().as_str(),
        "text" | "json"
    ) {
        errors.push(format!(
            "logging.format must be 'text' or 'json', got '{}'",
            config.logging.format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.usage.free_tier_limit = 0;
        config.storage.key = " ".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("usage.free_tier_limit"));
        assert!(err.contains("storage.key"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
