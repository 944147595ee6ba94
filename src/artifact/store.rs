//! `FsArtifactStore`: the filesystem-rooted implementation of C1's
//! operations (spec §4.1). Atomic writes follow
//! `autonomous/persistence.rs`'s temp-file-then-rename discipline, extended
//! with an explicit `fsync` (spec §4.1 "write to a temp file ..., fsync,
//! rename") since that pattern relies on the OS write-back alone.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::artifact::batch_progress::BatchProgress;
use crate::artifact::index::{Index, IndexItem};
use crate::artifact::item::Item;
use crate::artifact::lock::IndexLock;
use crate::artifact::prd::Prd;
use crate::error::WreckitError;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn items_dir(&self) -> PathBuf {
        self.root.join("items")
    }

    fn item_dir(&self, id: &str) -> PathBuf {
        self.items_dir().join(id)
    }

    fn item_path(&self, id: &str) -> PathBuf {
        self.item_dir(id).join("item.json")
    }

    fn prd_path(&self, id: &str) -> PathBuf {
        self.item_dir(id).join("prd.json")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(".wreckit").join("index.json")
    }

    fn batch_progress_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join(".wreckit")
            .join("sessions")
            .join(format!("{session_id}.json"))
    }

    fn progress_log_path(&self, id: &str) -> PathBuf {
        self.item_dir(id).join("progress.log")
    }

    /// Write `contents` to `path` atomically: temp file in the same
    /// directory, `fsync`, rename (spec §4.1).
    fn atomic_write(&self, path: &Path, contents: &[u8]) -> Result<(), WreckitError> {
        let dir = path.parent().expect("artifact paths always have a parent");
        std::fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        {
            let mut tmp_file = File::create(&tmp_path)?;
            use std::io::Write;
            tmp_file.write_all(contents)?;
            tmp_file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read_item(&self, id: &str) -> Result<Item, WreckitError> {
        let path = self.item_path(id);
        let data = std::fs::read(&path).map_err(|e| {
            WreckitError::invalid_artifact(&path, format!("failed to read item: {e}"))
        })?;
        serde_json::from_slice(&data)
            .map_err(|e| WreckitError::invalid_artifact(&path, format!("failed to parse item: {e}")))
    }

    pub fn write_item(&self, item: &Item) -> Result<(), WreckitError> {
        let mut item = item.clone();
        item.updated_at = Utc::now();
        let serialized = serde_json::to_vec_pretty(&item)?;
        self.atomic_write(&self.item_path(&item.id), &serialized)
    }

    pub fn read_prd(&self, id: &str) -> Result<Prd, WreckitError> {
        let path = self.prd_path(id);
        let data = std::fs::read(&path).map_err(|e| {
            WreckitError::invalid_artifact(&path, format!("failed to read prd: {e}"))
        })?;
        serde_json::from_slice(&data)
            .map_err(|e| WreckitError::invalid_artifact(&path, format!("failed to parse prd: {e}")))
    }

    pub fn write_prd(&self, prd: &Prd) -> Result<(), WreckitError> {
        let serialized = serde_json::to_vec_pretty(prd)?;
        self.atomic_write(&self.prd_path(&prd.item_id), &serialized)
    }

    /// Enumerate the items directory, reading each item's minimal
    /// projection, sorted by id ascending (spec §4.1 `scanItems`).
    pub fn scan_items(&self) -> Result<Vec<IndexItem>, WreckitError> {
        let dir = self.items_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.read_item(&id) {
                Ok(item) => entries.push(IndexItem::from(&item)),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping unreadable item during scan");
                }
            }
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    /// Read the persisted index as-is, with no lock held. Diagnostics use
    /// this to compare the index's own contents against a fresh directory
    /// scan; callers that need a consistent read-modify-write cycle should
    /// use `with_index_locked` instead.
    pub fn read_index(&self) -> Result<Index, WreckitError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Index::default());
        }
        let data = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&data).unwrap_or_default())
    }

    /// Read the index under the write lock, run `f` against it, then
    /// persist — the full read-modify-write cycle held under one lock
    /// (spec §4.1 "writers must hold the lock for the entire
    /// read-modify-write cycle").
    pub fn with_index_locked<F>(&self, f: F) -> Result<(), WreckitError>
    where
        F: FnOnce(&mut Index) -> Result<(), WreckitError>,
    {
        let mut lock = IndexLock::open(&self.root)?;
        let _guard = lock.acquire_write()?;

        let path = self.index_path();
        let mut index = if path.exists() {
            let data = std::fs::read(&path)?;
            serde_json::from_slice(&data).unwrap_or_default()
        } else {
            Index::default()
        };

        f(&mut index)?;

        let serialized = serde_json::to_vec_pretty(&index)?;
        self.atomic_write(&path, &serialized)
    }

    pub fn read_batch_progress(&self, session_id: &str) -> Result<BatchProgress, WreckitError> {
        let path = self.batch_progress_path(session_id);
        let data = std::fs::read(&path).map_err(|e| {
            WreckitError::invalid_artifact(&path, format!("failed to read batch progress: {e}"))
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            WreckitError::invalid_artifact(&path, format!("failed to parse batch progress: {e}"))
        })
    }

    pub fn write_batch_progress(&self, progress: &BatchProgress) -> Result<(), WreckitError> {
        let serialized = serde_json::to_vec_pretty(progress)?;
        self.atomic_write(&self.batch_progress_path(&progress.session_id), &serialized)
    }

    /// Append-only text log per item (spec §4.1 `append(progress-log, text)`).
    pub fn append_progress_log(&self, id: &str, text: &str) -> Result<(), WreckitError> {
        let path = self.progress_log_path(id);
        std::fs::create_dir_all(path.parent().expect("has parent"))?;
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{} {text}", Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Read every item's full record, sorted by id ascending. Heavier than
    /// `scan_items` (which returns the minimal index projection); used
    /// where callers need full records, e.g. rebuilding the index (spec
    /// §4.7.2 `INDEX_STALE` -> `scanItems`).
    pub fn read_all_items(&self) -> Result<Vec<Item>, WreckitError> {
        let dir = self.items_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            items.push(self.read_item(&id)?);
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Rebuild the index from on-disk item files under the write lock
    /// (spec §4.7.2 `INDEX_STALE` -> rebuild from `scanItems`).
    pub fn rebuild_index(&self) -> Result<(), WreckitError> {
        let items = self.read_all_items()?;
        self.with_index_locked(|index| {
            *index = Index::rebuild_from(&items);
            Ok(())
        })
    }

    /// Resolve a caller-supplied query — full id, numeric prefix, or a
    /// unique substring — to exactly one id (spec §4.1 "ID resolution").
    pub fn resolve_id(&self, query: &str) -> Result<String, WreckitError> {
        let items = self.scan_items()?;

        if items.iter().any(|i| i.id == query) {
            return Ok(query.to_string());
        }

        if let Ok(numeric) = query.parse::<u32>() {
            let matches: Vec<&IndexItem> = items
                .iter()
                .filter(|i| i.id.split('-').next().and_then(|p| p.parse::<u32>().ok()) == Some(numeric))
                .collect();
            return match matches.as_slice() {
                [single] => Ok(single.id.clone()),
                [] => Err(WreckitError::NotFound {
                    query: query.to_string(),
                }),
                _ => Err(WreckitError::AmbiguousId {
                    query: query.to_string(),
                    candidates: matches.iter().map(|i| i.id.clone()).collect(),
                }),
            };
        }

        let substring_matches: Vec<&IndexItem> =
            items.iter().filter(|i| i.id.contains(query)).collect();
        match substring_matches.as_slice() {
            [single] => Ok(single.id.clone()),
            [] => Err(WreckitError::NotFound {
                query: query.to_string(),
            }),
            _ => Err(WreckitError::AmbiguousId {
                query: query.to_string(),
                candidates: substring_matches.iter().map(|i| i.id.clone()).collect(),
            }),
        }
    }
}
