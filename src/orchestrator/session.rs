//! BatchProgress session lifecycle (spec §4.6.3): start a session, persist
//! progress after each phase advance, and detect stale sessions on resume.

use std::collections::HashSet;

use crate::artifact::batch_progress::BatchProgress;
use crate::artifact::store::FsArtifactStore;
use crate::error::WreckitError;

pub struct OrchestratorSession {
    progress: BatchProgress,
}

impl OrchestratorSession {
    pub fn start(
        store: &FsArtifactStore,
        session_id: impl Into<String>,
        parallel: usize,
        queued_items: Vec<String>,
    ) -> Result<Self, WreckitError> {
        let progress = BatchProgress::start(session_id, parallel, queued_items);
        store.write_batch_progress(&progress)?;
        Ok(Self { progress })
    }

    /// Reattach to an existing session by id, or detect that it is stale
    /// (spec §4.6.3 "On resume, detect stale sessions by checking whether
    /// pid is alive").
    pub fn resume(store: &FsArtifactStore, session_id: &str) -> Result<ResumeOutcome, WreckitError> {
        let progress = store.read_batch_progress(session_id)?;
        if progress.is_stale() {
            Ok(ResumeOutcome::Stale(progress))
        } else {
            Ok(ResumeOutcome::Active(Self { progress }))
        }
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    /// Ids that have already failed (non-healably) within this session, so
    /// the scheduler's runnability check can exclude them instead of
    /// reselecting a deterministically-failing item forever (spec §4.6.3).
    pub fn failed_ids(&self) -> HashSet<String> {
        self.progress.failed.iter().cloned().collect()
    }

    pub fn set_current(&mut self, item_id: Option<String>) {
        self.progress.current_item = item_id;
        self.progress.updated_at = chrono::Utc::now();
    }

    pub fn record_completed(&mut self, store: &FsArtifactStore, item_id: &str) -> Result<(), WreckitError> {
        self.progress.mark_completed(item_id);
        store.write_batch_progress(&self.progress)
    }

    pub fn record_failed(&mut self, store: &FsArtifactStore, item_id: &str) -> Result<(), WreckitError> {
        self.progress.mark_failed(item_id);
        store.write_batch_progress(&self.progress)
    }

    pub fn record_skipped(&mut self, store: &FsArtifactStore, item_id: &str) -> Result<(), WreckitError> {
        self.progress.mark_skipped(item_id);
        store.write_batch_progress(&self.progress)
    }

    pub fn record_healing_attempt(&mut self, store: &FsArtifactStore, item_id: &str) -> Result<u32, WreckitError> {
        let count = self.progress.record_healing_attempt(item_id);
        store.write_batch_progress(&self.progress)?;
        Ok(count)
    }
}

pub enum ResumeOutcome {
    Active(OrchestratorSession),
    Stale(BatchProgress),
}
