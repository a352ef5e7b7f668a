//! External anchors for tamper evidence beyond the hash chain
//!
//! - `resolve_git_anchor` captures the current commit of the working
//!   directory; it never fails, any problem simply means "no anchor"
//! - `write_anchor_file` drops a copy of a block's hash into a directory kept
//!   outside the ledger document

use crate::{types::Block, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Current commit of the process working directory, if any
pub async fn resolve_git_anchor() -> Option<String> {
    resolve_git_anchor_in(Path::new(".")).await
}

/// Current commit of the repository containing `dir`, if any
pub async fn resolve_git_anchor_in(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let commit = String::from_utf8(output.stdout).ok()?.trim().to_string();
    is_commit_id(&commit).then_some(commit)
}

/// SHA-1 (40) or SHA-256 (64) object name in lowercase hex
fn is_commit_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Out-of-band record of a block's hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRecord {
    /// Block index
    pub index: u64,

    /// Block hash
    pub hash: String,

    /// Anchor embedded in the block, if any
    pub anchor: Option<String>,

    /// Block timestamp
    pub timestamp: DateTime<Utc>,
}

impl From<&Block> for AnchorRecord {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index,
            hash: block.hash.clone(),
            anchor: block.anchor.clone(),
            timestamp: block.timestamp,
        }
    }
}

/// Write `<dir>/block-<index>.json` for `block`
pub async fn write_anchor_file(dir: &Path, block: &Block) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(format!("block-{}.json", block.index));
    let json = serde_json::to_vec_pretty(&AnchorRecord::from(block))?;
    tokio::fs::write(&path, json).await?;

    tracing::debug!(index = block.index, path = %path.display(), "Anchor file written");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_commit_id() {
        assert!(is_commit_id(&"a".repeat(40)));
        assert!(is_commit_id(&"0123456789abcdef".repeat(4)));
        assert!(!is_commit_id(""));
        assert!(!is_commit_id(&"A".repeat(40)));
        assert!(!is_commit_id(&"g".repeat(40)));
        assert!(!is_commit_id(&"a".repeat(39)));
    }

    #[tokio::test]
    async fn test_no_anchor_outside_repository() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_git_anchor_in(temp_dir.path()).await, None);
    }

    #[tokio::test]
    async fn test_no_anchor_for_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        assert_eq!(resolve_git_anchor_in(&missing).await, None);
    }

    #[tokio::test]
    async fn test_write_anchor_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("anchors");
        let mut block = Block::genesis().unwrap();
        block.anchor = Some("b".repeat(40));

        let path = write_anchor_file(&dir, &block).await.unwrap();
        assert_eq!(path, dir.join("block-0.json"));

        let record: AnchorRecord =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(record, AnchorRecord::from(&block));
    }
}
