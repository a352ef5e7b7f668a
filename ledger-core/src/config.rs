//! Configuration for hosting the ledger
//!
//! The library operations take [`StorageOptions`] explicitly and never read
//! this; it only feeds the single-writer actor and the demo binary.

use crate::storage::StorageOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the ledger JSON document
    pub ledger_path: PathBuf,

    /// HMAC secret for fingerprint derivation
    pub hmac_key: String,

    /// Directory for out-of-band anchor files (disabled when unset)
    pub anchor_dir: Option<PathBuf>,

    /// Bounded actor mailbox size
    pub mailbox_capacity: usize,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(".ethub-ledger.json"),
            hmac_key: "key".to_string(),
            anchor_dir: None,
            mailbox_capacity: 1000,
            log_format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    Pretty,
    /// JSON lines
    Json,
}

impl LogFormat {
    /// Parse "json" or "pretty" (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(path) = lookup("LEDGER_PATH") {
            config.ledger_path = PathBuf::from(path);
        }

        if let Some(key) = lookup("LEDGER_HMAC_KEY") {
            config.hmac_key = key;
        }

        if let Some(dir) = lookup("LEDGER_ANCHOR_DIR") {
            config.anchor_dir = Some(PathBuf::from(dir));
        }

        if let Some(capacity) = lookup("LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Some(format) = lookup("LEDGER_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| {
                crate::Error::Config(format!("Invalid LEDGER_LOG_FORMAT: {}", format))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }
        if self.hmac_key.is_empty() {
            return Err(crate::Error::Config("hmac_key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Storage options for the configured ledger path
    pub fn storage(&self) -> StorageOptions {
        StorageOptions::new(self.ledger_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ledger_path, PathBuf::from(".ethub-ledger.json"));
        assert_eq!(config.mailbox_capacity, 1000);
        assert!(config.anchor_dir.is_none());
    }

    #[test]
    fn test_from_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LEDGER_PATH", "/tmp/ledger.json"),
            ("LEDGER_HMAC_KEY", "s3cret"),
            ("LEDGER_ANCHOR_DIR", "/tmp/anchors"),
            ("LEDGER_MAILBOX_CAPACITY", "8"),
            ("LEDGER_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.storage().path, PathBuf::from("/tmp/ledger.json"));
        assert_eq!(config.hmac_key, "s3cret");
        assert_eq!(config.anchor_dir, Some(PathBuf::from("/tmp/anchors")));
        assert_eq!(config.mailbox_capacity, 8);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let result = Config::from_lookup(lookup(&[("LEDGER_MAILBOX_CAPACITY", "lots")]));
        assert!(matches!(result, Err(crate::Error::Config(_))));

        let result = Config::from_lookup(lookup(&[("LEDGER_MAILBOX_CAPACITY", "0")]));
        assert!(matches!(result, Err(crate::Error::Config(_))));

        let result = Config::from_lookup(lookup(&[("LEDGER_LOG_FORMAT", "xml")]));
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(
            &path,
            r#"
ledger_path = "data/ledger.json"
hmac_key = "from-file"
log_format = "json"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.ledger_path, PathBuf::from("data/ledger.json"));
        assert_eq!(config.hmac_key, "from-file");
        assert_eq!(config.log_format, LogFormat::Json);
        // Unset fields keep their defaults
        assert_eq!(config.mailbox_capacity, 1000);
    }

    #[test]
    fn test_from_file_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        std::fs::write(&path, "mailbox_capacity = \"many\"").unwrap();

        assert!(matches!(Config::from_file(&path), Err(crate::Error::Config(_))));
    }
}
