//! Fix pass (spec §4.7.2): one deterministic repair per fixable
//! diagnostic, each independent (spec "a failed fix does not roll back
//! previously applied ones but is reported with its error").

use crate::artifact::store::FsArtifactStore;
use crate::doctor::backup::BackupSession;
use crate::doctor::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::WreckitError;
use crate::workflow::state::ItemState;

#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub diagnostic_code: String,
    pub item_id: Option<String>,
    pub applied: bool,
    pub error: Option<String>,
}

/// Apply every fixable diagnostic in `diagnostics`, backing up each
/// affected file first. A diagnostic with `fixable = false` (cycles,
/// dangling references, unrecognized story ids) is skipped and reported as
/// non-fixable, never attempted.
pub fn apply_fixes(
    store: &FsArtifactStore,
    backups: &mut BackupSession,
    diagnostics: &[Diagnostic],
) -> Vec<FixOutcome> {
    diagnostics
        .iter()
        .filter(|d| d.fixable)
        .map(|d| apply_one_fix(store, backups, d))
        .collect()
}

fn apply_one_fix(store: &FsArtifactStore, backups: &mut BackupSession, diagnostic: &Diagnostic) -> FixOutcome {
    let result = match &diagnostic.code {
        DiagnosticCode::IndexStale => fix_index_stale(store, backups),
        DiagnosticCode::StateFileMismatch => fix_state_file_mismatch(store, backups, diagnostic),
        DiagnosticCode::PrdMissingId => fix_prd_missing_id(store, backups, diagnostic),
        DiagnosticCode::PrdMissingBranchName => fix_prd_missing_branch_name(store, backups, diagnostic),
        DiagnosticCode::PrdInvalidPriority => fix_prd_invalid_priority(store, backups, diagnostic),
        DiagnosticCode::OrphanedVmDetected => Ok(()), // async VM kill handled by the caller (spec: no backup needed, ephemeral)
        _ => Err(WreckitError::DoctorFailed(format!(
            "{:?} has no deterministic repair",
            diagnostic.code
        ))),
    };

    FixOutcome {
        diagnostic_code: format!("{:?}", diagnostic.code),
        item_id: diagnostic.item_id.clone(),
        applied: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
    }
}

fn fix_index_stale(store: &FsArtifactStore, _backups: &mut BackupSession) -> Result<(), WreckitError> {
    store.rebuild_index()
}

fn item_path(store: &FsArtifactStore, id: &str) -> std::path::PathBuf {
    store.root().join("items").join(id).join("item.json")
}

fn prd_path(store: &FsArtifactStore, id: &str) -> std::path::PathBuf {
    store.root().join("items").join(id).join("prd.json")
}

/// Downgrade the item's state to the highest state whose precondition is
/// satisfied (spec §4.7.2 `STATE_FILE_MISMATCH`).
fn fix_state_file_mismatch(
    store: &FsArtifactStore,
    backups: &mut BackupSession,
    diagnostic: &Diagnostic,
) -> Result<(), WreckitError> {
    let item_id = diagnostic
        .item_id
        .as_deref()
        .ok_or_else(|| WreckitError::DoctorFailed("missing item id".to_string()))?;

    let path = item_path(store, item_id);
    backups.back_up(&path, "STATE_FILE_MISMATCH")?;

    let mut item = store.read_item(item_id)?;
    let item_dir = store.root().join("items").join(item_id);
    let has_research = item_dir.join("research.md").exists();
    let has_plan = item_dir.join("plan.md").exists();

    item.state = match (has_research, has_plan) {
        (false, _) => ItemState::Raw,
        (true, false) => ItemState::Researched,
        (true, true) => ItemState::Planned,
    };
    store.write_item(&item)
}

fn fix_prd_missing_id(
    store: &FsArtifactStore,
    backups: &mut BackupSession,
    diagnostic: &Diagnostic,
) -> Result<(), WreckitError> {
    let item_id = diagnostic
        .item_id
        .as_deref()
        .ok_or_else(|| WreckitError::DoctorFailed("missing item id".to_string()))?;

    let path = prd_path(store, item_id);
    backups.back_up(&path, "PRD_MISSING_ID")?;

    let mut prd = store.read_prd(item_id)?;
    prd.id = Some(item_id.to_string());
    store.write_prd(&prd)
}

fn fix_prd_missing_branch_name(
    store: &FsArtifactStore,
    backups: &mut BackupSession,
    diagnostic: &Diagnostic,
) -> Result<(), WreckitError> {
    let item_id = diagnostic
        .item_id
        .as_deref()
        .ok_or_else(|| WreckitError::DoctorFailed("missing item id".to_string()))?;

    let path = prd_path(store, item_id);
    backups.back_up(&path, "PRD_MISSING_BRANCH_NAME")?;

    let mut prd = store.read_prd(item_id)?;
    prd.branch_name = Some(format!("wreckit/{item_id}"));
    store.write_prd(&prd)
}

/// Clamp each story priority to [1,4] (spec §4.7.2 `PRD_INVALID_PRIORITY`).
fn fix_prd_invalid_priority(
    store: &FsArtifactStore,
    backups: &mut BackupSession,
    diagnostic: &Diagnostic,
) -> Result<(), WreckitError> {
    let item_id = diagnostic
        .item_id
        .as_deref()
        .ok_or_else(|| WreckitError::DoctorFailed("missing item id".to_string()))?;

    let path = prd_path(store, item_id);
    backups.back_up(&path, "PRD_INVALID_PRIORITY")?;

    let mut prd = store.read_prd(item_id)?;
    for story in &mut prd.user_stories {
        story.priority = story.priority.clamp(1, 4);
    }
    store.write_prd(&prd)
}
