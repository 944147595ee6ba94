//! Thin command layer: each subcommand wires the CLI's parsed arguments
//! into the core modules and prints a human-readable summary. No business
//! logic lives here — it belongs in `artifact`, `workflow`, `orchestrator`,
//! or `doctor`.

pub mod doctor;
pub mod idea;
pub mod orchestrate;
pub mod phase;
pub mod show;
pub mod sprite;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::artifact::store::FsArtifactStore;
use crate::config::WreckitConfig;
use crate::git::operations::Git2Operations;
use crate::orchestrator::session::OrchestratorSession;
use crate::prompts::PlainPromptRenderer;
use crate::skills::NoSkills;

/// Shared handles every command needs: the store rooted at `root`, a git
/// binding into the same repo, and the loaded config.
pub struct CliContext {
    pub store: FsArtifactStore,
    pub git: Git2Operations,
    pub config: WreckitConfig,
}

pub fn open_context(root: Option<&str>) -> Result<CliContext> {
    let root: PathBuf = root.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let store = FsArtifactStore::new(root.clone());
    let git = Git2Operations::new(&root).context("failed to open git repository at root")?;
    let config = WreckitConfig::load().unwrap_or_default();
    Ok(CliContext { store, git, config })
}

pub fn plain_renderer() -> PlainPromptRenderer {
    PlainPromptRenderer
}

pub fn no_skills() -> NoSkills {
    NoSkills
}

pub fn start_session(store: &FsArtifactStore, queued_items: Vec<String>, parallel: usize) -> Result<Mutex<OrchestratorSession>> {
    let session_id = format!("orchestrate-{}", std::process::id());
    let session = OrchestratorSession::start(store, session_id, parallel, queued_items)
        .context("failed to start orchestrator session")?;
    Ok(Mutex::new(session))
}
