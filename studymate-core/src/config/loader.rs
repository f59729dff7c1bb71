//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".studymate"))
            .unwrap_or_else(|| PathBuf::from(".studymate"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_file(&mut merged, file_value);
        }

        apply_env_overrides(&mut merged, std::env::vars())?;

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_dir.join("config.json");
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-variable shortcuts, applied before `STUDYMATE__SECTION__FIELD`
const ALIASES: &[(&str, &str, &str)] = &[
    ("STUDYMATE_API_KEY", "backend", "api_key"),
    ("STUDYMATE_MODEL", "backend", "model"),
    ("STUDYMATE_STORAGE_DIR", "storage", "dir"),
];

const PATH_PREFIX: &str = "STUDYMATE__";

/// Overlay `config.json` onto the defaults, section by section. Unknown
/// sections are skipped with a warning; serde reports bad fields later.
fn merge_file(defaults: &mut Value, file: Value) {
    let (Value::Object(sections), Value::Object(file_sections)) = (defaults, file) else {
        warn!("config.json is not a JSON object; using defaults");
        return;
    };
    for (name, fields) in file_sections {
        match (sections.get_mut(&name), fields) {
            (Some(Value::Object(section)), Value::Object(fields)) => section.extend(fields),
            (Some(slot), other) => *slot = other,
            (None, _) => warn!(section = %name, "Ignoring unknown config section"),
        }
    }
}

/// Apply alias and path overrides from `vars`. Path overrides name a known
/// section and field; the raw string is read as the type of the default.
fn apply_env_overrides(
    config: &mut Value,
    vars: impl IntoIterator<Item = (String, String)>,
) -> crate::Result<()> {
    let vars: Vec<(String, String)> = vars.into_iter().collect();

    for (alias, section, field) in ALIASES {
        if let Some((_, raw)) = vars.iter().find(|(key, _)| key == alias) {
            set_field(config, alias, section, field, raw)?;
        }
    }

    let mut paths: Vec<&(String, String)> = vars
        .iter()
        .filter(|(key, _)| key.starts_with(PATH_PREFIX))
        .collect();
    paths.sort();
    for (key, raw) in paths {
        let suffix = key[PATH_PREFIX.len()..].to_ascii_lowercase();
        let Some((section, field)) = suffix.split_once("__") else {
            return Err(crate::Error::Config(format!(
                "{} must have the form STUDYMATE__SECTION__FIELD",
                key
            )));
        };
        set_field(config, key, section, field, raw)?;
    }
    Ok(())
}

fn set_field(
    config: &mut Value,
    var: &str,
    section: &str,
    field: &str,
    raw: &str,
) -> crate::Result<()> {
    let slot = config
        .get_mut(section)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| crate::Error::Config(format!("{}: unknown section '{}'", var, section)))?
        .get_mut(field)
        .ok_or_else(|| {
            crate::Error::Config(format!("{}: unknown field '{}.{}'", var, section, field))
        })?;
    *slot = coerce(slot, raw).ok_or_else(|| {
        crate::Error::Config(format!(
            "{}: cannot read '{}' as {}.{}",
            var, raw, section, field
        ))
    })?;
    debug!(var, "Applied config override");
    Ok(())
}

/// Read `raw` as the same JSON type as `current`
fn coerce(current: &Value, raw: &str) -> Option<Value> {
    match current {
        Value::String(_) => Some(Value::String(raw.to_string())),
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(_) => raw.trim().parse::<u64>().ok().map(Value::from),
        Value::Object(_) | Value::Array(_) => serde_json::from_str(raw).ok(),
        Value::Null => Some(Value::String(raw.to_string())),
    }
}
