//! Storage layer: the whole ledger as one JSON document
//!
//! Saves go through a sibling temp file that is fsynced and renamed over the
//! target, so a crash mid-write never leaves a truncated document behind.

use crate::{types::LedgerState, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Where a ledger lives; passed explicitly on every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOptions {
    /// Path of the JSON document
    pub path: PathBuf,
}

impl StorageOptions {
    /// Options for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Load the ledger document, `None` if it does not exist yet
pub async fn load_state(options: &StorageOptions) -> Result<Option<LedgerState>> {
    let raw = match fs::read(&options.path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %options.path.display(), "No ledger document yet");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let state: LedgerState = serde_json::from_slice(&raw)?;

    tracing::debug!(
        path = %options.path.display(),
        blocks = state.blocks.len(),
        accounts = state.accounts.len(),
        "Ledger loaded"
    );

    Ok(Some(state))
}

/// Overwrite the ledger document with `state`
pub async fn save_state(state: &LedgerState, options: &StorageOptions) -> Result<()> {
    if let Some(parent) = options.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(state)?;
    let temp = options.temp_path();

    write_synced(&temp, &json).await?;
    if let Err(e) = fs::rename(&temp, &options.path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }

    tracing::debug!(
        path = %options.path.display(),
        blocks = state.blocks.len(),
        bytes = json.len(),
        "Ledger saved"
    );

    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_options() -> (StorageOptions, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let options = StorageOptions::new(temp_dir.path().join("ledger.json"));
        (options, temp_dir)
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let (options, _temp) = test_options();
        assert!(load_state(&options).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (options, _temp) = test_options();
        let state = LedgerState::new().unwrap();

        save_state(&state, &options).await.unwrap();

        let loaded = load_state(&options).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(!options.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let options = StorageOptions::new(temp_dir.path().join("nested/deeper/ledger.json"));

        save_state(&LedgerState::new().unwrap(), &options).await.unwrap();
        assert!(options.path.exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (options, _temp) = test_options();
        let first = LedgerState::new().unwrap();
        let second = LedgerState::new().unwrap();

        save_state(&first, &options).await.unwrap();
        save_state(&second, &options).await.unwrap();

        let loaded = load_state(&options).await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn test_malformed_document() {
        let (options, _temp) = test_options();
        std::fs::write(&options.path, b"{ not json").unwrap();

        let result = load_state(&options).await;
        assert!(matches!(result, Err(crate::Error::Serialization(_))));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let options = StorageOptions::new("/var/lib/ledger/state.json");
        assert_eq!(
            options.temp_path(),
            PathBuf::from("/var/lib/ledger/state.json.tmp")
        );
    }
}
