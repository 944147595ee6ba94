//! Diagnostic pass (spec §4.7.1): scan the Artifact Store, index, PRDs, and
//! sandbox state for inconsistencies. Read-only — no mutation happens here,
//! the fix pass in [`super::fixes`] consumes this output.

use std::collections::{HashMap, HashSet};

use crate::artifact::batch_progress::BatchProgress;
use crate::artifact::prd::Prd;
use crate::artifact::store::FsArtifactStore;
use crate::orchestrator::dependency::DependencyGraph;
use crate::workflow::state::ItemState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticCode {
    IndexStale,
    StateFileMismatch,
    PrdMissingId,
    PrdMissingBranchName,
    PrdInvalidPriority,
    PrdInvalidStoryId,
    DependencyCycle,
    DanglingDependency,
    DuplicateItemId,
    OrphanedBatchProgress,
    SandboxCliMissing,
    SandboxTokenMissing,
    OrphanedVmDetected,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub item_id: Option<String>,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub fixable: bool,
}

const STORY_ID_PATTERN_HINT: &str = "US-### or US-{item}-{seq}";

fn valid_story_id(id: &str) -> bool {
    let rest = match id.strip_prefix("US-") {
        Some(rest) => rest,
        None => return false,
    };
    if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
        return true;
    }
    let mut parts = rest.splitn(2, '-');
    match (parts.next(), parts.next()) {
        (Some(item), Some(seq)) => {
            !item.is_empty()
                && !seq.is_empty()
                && item.chars().all(|c| c.is_ascii_digit())
                && seq.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Run every diagnostic check against the current on-disk state (spec
/// §4.7.1's full list).
pub fn run_diagnostics(store: &FsArtifactStore) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let items = match store.scan_items() {
        Ok(items) => items,
        Err(e) => {
            diagnostics.push(Diagnostic {
                item_id: None,
                severity: Severity::Error,
                code: DiagnosticCode::IndexStale,
                message: format!("failed to scan items: {e}"),
                fixable: true,
            });
            return diagnostics;
        }
    };

    // Duplicate ids: scan_items reads one directory per id so the freshly
    // scanned list can never contain a duplicate itself. A duplicate can
    // only arise in the persisted index.json (e.g. a write that raced the
    // lock), so check the on-disk index's own entries against the set of
    // ids the filesystem actually has.
    let fs_ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    let index = store.read_index().unwrap_or_default();
    let mut seen = HashSet::new();
    for entry in &index.items {
        if !seen.insert(entry.id.clone()) && fs_ids.contains(entry.id.as_str()) {
            diagnostics.push(Diagnostic {
                item_id: Some(entry.id.clone()),
                severity: Severity::Error,
                code: DiagnosticCode::DuplicateItemId,
                message: format!("duplicate item id '{}' in index.json", entry.id),
                fixable: false,
            });
        }
    }

    let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    for item in &items {
        for dep in &item.depends_on {
            if !ids.contains(dep.as_str()) {
                diagnostics.push(Diagnostic {
                    item_id: Some(item.id.clone()),
                    severity: Severity::Error,
                    code: DiagnosticCode::DanglingDependency,
                    message: format!("'{}' depends on unknown id '{dep}'", item.id),
                    fixable: false,
                });
            }
        }
    }

    let graph = DependencyGraph::build(&items);
    if let Some(cycle) = graph.find_cycle() {
        diagnostics.push(Diagnostic {
            item_id: None,
            severity: Severity::Error,
            code: DiagnosticCode::DependencyCycle,
            message: format!("dependency cycle: {}", cycle.join(" -> ")),
            fixable: false,
        });
    }

    for index_item in &items {
        let Ok(item) = store.read_item(&index_item.id) else {
            continue;
        };

        // State-vs-artifact disagreement (spec "state=planned but no plan.md").
        let item_dir_has = |name: &str| {
            store
                .root()
                .join("items")
                .join(&item.id)
                .join(name)
                .exists()
        };
        let mismatch = match item.state {
            ItemState::Researched | ItemState::Planned | ItemState::Implementing
                if !item_dir_has("research.md") =>
            {
                Some("state implies research.md should exist but it is missing")
            }
            ItemState::Planned | ItemState::Implementing if !item_dir_has("plan.md") => {
                Some("state implies plan.md should exist but it is missing")
            }
            _ => None,
        };
        if let Some(message) = mismatch {
            diagnostics.push(Diagnostic {
                item_id: Some(item.id.clone()),
                severity: Severity::Error,
                code: DiagnosticCode::StateFileMismatch,
                message: message.to_string(),
                fixable: true,
            });
        }

        if let Ok(prd) = store.read_prd(&item.id) {
            diagnostics.extend(prd_diagnostics(&item.id, &prd));
        }
    }

    diagnostics.extend(orphaned_session_diagnostics(store, &items.iter().map(|i| i.id.clone()).collect::<Vec<_>>()));

    diagnostics
}

fn prd_diagnostics(item_id: &str, prd: &Prd) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if prd.id.is_none() {
        diagnostics.push(Diagnostic {
            item_id: Some(item_id.to_string()),
            severity: Severity::Warning,
            code: DiagnosticCode::PrdMissingId,
            message: "prd.json has no top-level id".to_string(),
            fixable: true,
        });
    }
    if prd.branch_name.is_none() {
        diagnostics.push(Diagnostic {
            item_id: Some(item_id.to_string()),
            severity: Severity::Warning,
            code: DiagnosticCode::PrdMissingBranchName,
            message: "prd.json has no top-level branch_name".to_string(),
            fixable: true,
        });
    }
    for story in &prd.user_stories {
        if !(1..=4).contains(&story.priority) {
            diagnostics.push(Diagnostic {
                item_id: Some(item_id.to_string()),
                severity: Severity::Error,
                code: DiagnosticCode::PrdInvalidPriority,
                message: format!("story '{}' has priority {} outside [1,4]", story.id, story.priority),
                fixable: true,
            });
        }
        if !valid_story_id(&story.id) {
            diagnostics.push(Diagnostic {
                item_id: Some(item_id.to_string()),
                severity: Severity::Error,
                code: DiagnosticCode::PrdInvalidStoryId,
                message: format!("story id '{}' does not match {STORY_ID_PATTERN_HINT}", story.id),
                fixable: false,
            });
        }
    }

    diagnostics
}

fn orphaned_session_diagnostics(store: &FsArtifactStore, _item_ids: &[String]) -> Vec<Diagnostic> {
    let sessions_dir = store.root().join(".wreckit").join("sessions");
    let Ok(entries) = std::fs::read_dir(&sessions_dir) else {
        return Vec::new();
    };

    let mut diagnostics = Vec::new();
    for entry in entries.flatten() {
        let Some(session_id) = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
        else {
            continue;
        };
        let Ok(progress) = store.read_batch_progress(&session_id) else {
            continue;
        };
        if progress.is_stale() {
            diagnostics.push(Diagnostic {
                item_id: None,
                severity: Severity::Warning,
                code: DiagnosticCode::OrphanedBatchProgress,
                message: format!("session '{session_id}' pid {} is dead", progress.pid),
                fixable: false,
            });
        }
    }
    diagnostics
}

/// Diagnose sandbox subsystem health: CLI availability, auth token, and
/// orphaned VMs matching `wreckit-sandbox-*` older than one hour (spec
/// §4.7.1). Split out from `run_diagnostics` since it needs the sandbox
/// CLI's async surface.
pub async fn run_sandbox_diagnostics(
    cli: &Result<crate::sandbox::vm::SandboxCli, crate::error::WreckitError>,
    now_epoch_ms: u64,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let cli = match cli {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.to_string().contains("token") {
                DiagnosticCode::SandboxTokenMissing
            } else {
                DiagnosticCode::SandboxCliMissing
            };
            diagnostics.push(Diagnostic {
                item_id: None,
                severity: Severity::Warning,
                code,
                message: e.to_string(),
                fixable: false,
            });
            return diagnostics;
        }
    };

    let Ok(vms) = cli.list_vms().await else {
        return diagnostics;
    };

    const ONE_HOUR_MS: u64 = 60 * 60 * 1000;
    for name in vms {
        if !name.starts_with("wreckit-sandbox-") {
            continue;
        }
        let Some(created_ms) = name.rsplit('-').next().and_then(|s| s.parse::<u64>().ok()) else {
            continue;
        };
        if now_epoch_ms.saturating_sub(created_ms) > ONE_HOUR_MS {
            diagnostics.push(Diagnostic {
                item_id: None,
                severity: Severity::Warning,
                code: DiagnosticCode::OrphanedVmDetected,
                message: format!("VM '{name}' is older than one hour and has no owner"),
                fixable: true,
            });
        }
    }

    diagnostics
}

#[derive(Default)]
pub struct DiagnosticReport(Vec<Diagnostic>);

impl DiagnosticReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }

    pub fn fixable(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.fixable)
    }

    pub fn by_code(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for d in &self.0 {
            *counts.entry(format!("{:?}", d.code)).or_insert(0) += 1;
        }
        counts
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.0
    }
}
