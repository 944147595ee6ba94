//! Per-session backup manifest (spec §4.7.2: "Before any mutating repair,
//! back up the affected file ... append an entry to a backup manifest. The
//! repair is safe iff the backup succeeds first"). Grounded on
//! `autonomous/persistence.rs`'s checkpoint-directory-per-agent layout,
//! scaled to one backup directory per doctor run instead of per agent.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WreckitError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub diagnostic_code: String,
    pub backed_up_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackupManifest {
    pub entries: Vec<BackupEntry>,
}

pub struct BackupSession {
    dir: PathBuf,
    manifest: BackupManifest,
    manifest_path: PathBuf,
}

impl BackupSession {
    /// Open (creating if needed) the backup directory for one doctor run.
    pub fn open(root: &Path, session_id: &str) -> Result<Self, WreckitError> {
        let dir = root.join(".wreckit").join("backups").join(session_id);
        std::fs::create_dir_all(&dir)?;
        let manifest_path = dir.join("manifest.json");
        let manifest = if manifest_path.exists() {
            let data = std::fs::read(&manifest_path)?;
            serde_json::from_slice(&data).unwrap_or_default()
        } else {
            BackupManifest::default()
        };
        Ok(Self {
            dir,
            manifest,
            manifest_path,
        })
    }

    /// Copy `original` into the backup directory and append a manifest
    /// entry. Returns the backup path on success; a failed backup means the
    /// caller must not proceed with the repair (spec "the repair is safe
    /// iff the backup succeeds first").
    pub fn back_up(&mut self, original: &Path, diagnostic_code: &str) -> Result<PathBuf, WreckitError> {
        let file_name = original
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let backup_path = self.dir.join(format!("{}.{file_name}", self.manifest.entries.len()));
        std::fs::copy(original, &backup_path)?;

        self.manifest.entries.push(BackupEntry {
            original_path: original.to_path_buf(),
            backup_path: backup_path.clone(),
            diagnostic_code: diagnostic_code.to_string(),
            backed_up_at: Utc::now(),
        });
        self.persist_manifest()?;
        Ok(backup_path)
    }

    fn persist_manifest(&self) -> Result<(), WreckitError> {
        let serialized = serde_json::to_vec_pretty(&self.manifest)?;
        std::fs::write(&self.manifest_path, serialized)?;
        Ok(())
    }

    pub fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn back_up_copies_file_and_records_manifest_entry() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("item.json");
        std::fs::write(&original, b"{}").unwrap();

        let mut session = BackupSession::open(dir.path(), "sess-1").unwrap();
        let backup_path = session.back_up(&original, "STATE_FILE_MISMATCH").unwrap();

        assert!(backup_path.exists());
        assert_eq!(session.manifest().entries.len(), 1);
        assert_eq!(session.manifest().entries[0].diagnostic_code, "STATE_FILE_MISMATCH");
    }

    #[test]
    fn reopening_a_session_loads_existing_manifest() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("item.json");
        std::fs::write(&original, b"{}").unwrap();

        {
            let mut session = BackupSession::open(dir.path(), "sess-1").unwrap();
            session.back_up(&original, "INDEX_STALE").unwrap();
        }

        let reopened = BackupSession::open(dir.path(), "sess-1").unwrap();
        assert_eq!(reopened.manifest().entries.len(), 1);
    }
}
