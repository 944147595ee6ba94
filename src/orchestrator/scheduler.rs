//! Worker pool scheduler (spec §4.6.2 "cooperative-on-top-of-parallel"): N
//! cooperatively-scheduled workers share a mutex-guarded claim set over the
//! index and each drive exactly one phase of one item per iteration.
//!
//! Workers are plain futures polled concurrently within the calling task
//! via `futures::future::join_all`, not spawned onto separate OS threads:
//! `GitOperations` wraps a `git2::Repository`, which is not `Send`, so true
//! OS-thread parallelism would need a connection-per-thread pool this crate
//! does not need yet. Concurrency here is real (N items can be mid-agent-
//! turn at once, interleaved cooperatively) even though it stays on one
//! thread; this is the "tasks" half of "OS threads or tasks —
//! implementation-defined, both valid."

use std::collections::HashSet;
use std::sync::Mutex;

use crate::agent::AgentConfig;
use crate::artifact::store::FsArtifactStore;
use crate::config::AutoRepairMode;
use crate::doctor::backup::BackupSession;
use crate::doctor::diagnostics::{run_diagnostics, Diagnostic, DiagnosticCode};
use crate::doctor::fixes::apply_fixes;
use crate::error::WreckitError;
use crate::git::operations::GitOperations;
use crate::orchestrator::dependency::DependencyGraph;
use crate::orchestrator::runnability::select_runnable;
use crate::orchestrator::session::OrchestratorSession;
use crate::prompts::PromptRenderer;
use crate::skills::SkillLoader;
use crate::workflow::executor::execute_phase;
use crate::workflow::state::Phase;

pub struct SchedulerConfig {
    pub parallel: usize,
    pub timeout_seconds: u64,
    pub auto_repair: AutoRepairMode,
    pub max_retries: u32,
    pub dry_run: bool,
    pub agent_config: AgentConfig,
}

#[derive(Debug, Clone)]
pub struct ItemRunSummary {
    pub item_id: String,
    pub outcome: ItemRunOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRunOutcome {
    Advanced,
    Failed(String),
}

struct ClaimSet(Mutex<HashSet<String>>);

impl ClaimSet {
    fn new() -> Self {
        Self(Mutex::new(HashSet::new()))
    }

    fn claimed_snapshot(&self) -> HashSet<String> {
        self.0.lock().expect("claim set mutex poisoned").clone()
    }

    fn try_claim(&self, id: &str) -> bool {
        self.0.lock().expect("claim set mutex poisoned").insert(id.to_string())
    }

    fn release(&self, id: &str) {
        self.0.lock().expect("claim set mutex poisoned").remove(id);
    }
}

/// Run the scheduler to completion: repeatedly dispatch runnable items to
/// `config.parallel` cooperative workers until no item is runnable and none
/// is claimed (spec §4.6.2 "picks the next runnable item ... processes
/// exactly one phase ... releases the claim, and loops").
pub async fn run_to_quiescence(
    store: &FsArtifactStore,
    git: &dyn GitOperations,
    renderer: &dyn PromptRenderer,
    skill_loader: &dyn SkillLoader,
    session: &Mutex<OrchestratorSession>,
    config: &SchedulerConfig,
) -> Result<Vec<ItemRunSummary>, WreckitError> {
    let items = store.scan_items()?;
    let graph = DependencyGraph::build(&items);
    graph.check_acyclic()?;

    let claims = ClaimSet::new();
    let mut results = Vec::new();

    loop {
        let items = store.scan_items()?;
        let claimed = claims.claimed_snapshot();
        let failed = session.lock().expect("session mutex poisoned").failed_ids();
        let runnable = select_runnable(&items, &claimed, &failed);

        if runnable.is_empty() {
            break;
        }

        let batch: Vec<String> = runnable.into_iter().take(config.parallel.max(1)).collect();
        for id in &batch {
            claims.try_claim(id);
        }

        let worker_futures = batch.iter().map(|id| {
            run_one_item(store, git, renderer, skill_loader, session, &claims, config, id)
        });
        let batch_results = futures::future::join_all(worker_futures).await;
        results.extend(batch_results);
    }

    Ok(results)
}

async fn run_one_item(
    store: &FsArtifactStore,
    git: &dyn GitOperations,
    renderer: &dyn PromptRenderer,
    skill_loader: &dyn SkillLoader,
    session: &Mutex<OrchestratorSession>,
    claims: &ClaimSet,
    config: &SchedulerConfig,
    item_id: &str,
) -> ItemRunSummary {
    {
        let mut session = session.lock().expect("session mutex poisoned");
        session.set_current(Some(item_id.to_string()));
    }

    let item = match store.read_item(item_id) {
        Ok(item) => item,
        Err(e) => {
            claims.release(item_id);
            return ItemRunSummary {
                item_id: item_id.to_string(),
                outcome: ItemRunOutcome::Failed(e.to_string()),
            };
        }
    };

    let outcome = match Phase::for_state(item.state) {
        None => ItemRunOutcome::Failed(format!("no phase dispatches from state {:?}", item.state)),
        Some(phase) => {
            run_phase_with_healing(store, git, renderer, skill_loader, session, config, item_id, phase).await
        }
    };

    claims.release(item_id);

    {
        let mut session = session.lock().expect("session mutex poisoned");
        match &outcome {
            ItemRunOutcome::Advanced => {
                let _ = session.record_completed(store, item_id);
            }
            ItemRunOutcome::Failed(_) => {
                let _ = session.record_failed(store, item_id);
            }
        }
    }

    ItemRunSummary {
        item_id: item_id.to_string(),
        outcome,
    }
}

/// Run one phase; on a healable failure (spec §4.7.3), run the doctor's
/// diagnose-then-fix pass and retry up to `config.max_retries` times before
/// giving up. Gated by `config.auto_repair` (`False` never retries).
#[allow(clippy::too_many_arguments)]
async fn run_phase_with_healing(
    store: &FsArtifactStore,
    git: &dyn GitOperations,
    renderer: &dyn PromptRenderer,
    skill_loader: &dyn SkillLoader,
    session: &Mutex<OrchestratorSession>,
    config: &SchedulerConfig,
    item_id: &str,
    phase: Phase,
) -> ItemRunOutcome {
    let mut attempt = 0;
    loop {
        let result = execute_phase(
            store,
            git,
            renderer,
            skill_loader,
            config.agent_config.clone(),
            item_id,
            phase,
            config.timeout_seconds,
            config.dry_run,
        )
        .await;

        let err = match result {
            Ok(outcome) if outcome.advanced_to.is_some() => return ItemRunOutcome::Advanced,
            Ok(outcome) => {
                return ItemRunOutcome::Failed(outcome.blocked_reason.unwrap_or_else(|| "blocked".to_string()))
            }
            Err(e) => e,
        };

        if config.auto_repair == AutoRepairMode::False
            || !err.is_healable_signature()
            || attempt >= config.max_retries
        {
            return ItemRunOutcome::Failed(err.to_string());
        }

        attempt += 1;
        let healed = attempt_heal(store, config, item_id);
        {
            let mut session = session.lock().expect("session mutex poisoned");
            let _ = session.record_healing_attempt(store, item_id);
        }
        if !healed {
            return ItemRunOutcome::Failed(err.to_string());
        }
    }
}

/// Run diagnostics and apply whichever fixes `config.auto_repair` allows.
/// `SafeOnly` excludes `StateFileMismatch`, since downgrading an item's
/// state is itself a workflow-visible mutation rather than pure hygiene.
/// Returns whether at least one fix was applied, i.e. whether a retry has
/// any chance of behaving differently.
fn attempt_heal(store: &FsArtifactStore, config: &SchedulerConfig, item_id: &str) -> bool {
    let diagnostics: Vec<Diagnostic> = run_diagnostics(store)
        .into_iter()
        .filter(|d| d.item_id.as_deref() == Some(item_id) || d.item_id.is_none())
        .filter(|d| {
            config.auto_repair != AutoRepairMode::SafeOnly || d.code != DiagnosticCode::StateFileMismatch
        })
        .collect();

    if diagnostics.is_empty() {
        return false;
    }

    let session_id = format!("heal-{item_id}-{}", std::process::id());
    let mut backups = match BackupSession::open(store.root(), &session_id) {
        Ok(b) => b,
        Err(_) => return false,
    };

    apply_fixes(store, &mut backups, &diagnostics)
        .iter()
        .any(|outcome| outcome.applied)
}
