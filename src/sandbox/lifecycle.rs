//! Lifecycle of one sprite run (spec §4.4 "Lifecycle of one sprite run").
//! Resolve/ensure VM, push the project, run the agent turn, optionally pull
//! results back, and tear down unconditionally. Grounded on the *shape* of
//! `agents/process_manager.rs`'s spawn-then-guaranteed-cleanup discipline,
//! applied here to a VM instead of a local child process.

use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;

use base64::Engine;
use tokio::process::Command;

use crate::agent::AgentConfig;
use crate::config::SandboxConfig;
use crate::error::{SandboxErrorKind, WreckitError};
use crate::sandbox::session::{Session, SessionState};
use crate::sandbox::vm::SandboxCli;

const VM_ROOT: &str = "/home/user/project";

/// The "currently-owned ephemeral VM" pointer (spec §4.3.4, §4.4 step 6):
/// at most one ephemeral VM is owned by this process's sprite runner at a
/// time, and it must be cleared on every exit path.
pub struct OwnedVmPointer {
    current: Mutex<Option<String>>,
}

impl Default for OwnedVmPointer {
    fn default() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl OwnedVmPointer {
    pub fn global() -> &'static OwnedVmPointer {
        static POINTER: std::sync::OnceLock<OwnedVmPointer> = std::sync::OnceLock::new();
        POINTER.get_or_init(OwnedVmPointer::default)
    }

    fn set(&self, name: Option<String>) {
        *self.current.lock().expect("owned-vm mutex poisoned") = name;
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().expect("owned-vm mutex poisoned").clone()
    }
}

pub struct SpriteRunRequest<'a> {
    pub item_id: &'a str,
    pub project_dir: &'a Path,
    pub vm_name: Option<&'a str>,
    pub memory_mb: u64,
    pub cpus: u32,
    pub sync_on_success: bool,
}

pub struct SpriteRunOutcome {
    pub vm_name: String,
    pub ephemeral: bool,
    pub pulled: bool,
}

/// Run steps 1-3 of the lifecycle: resolve the VM name, ensure it exists,
/// and push the project. Returns the resolved name and whether it is
/// ephemeral (and therefore owned by this run and killable on teardown).
pub async fn resolve_and_push(
    cli: &SandboxCli,
    config: &SandboxConfig,
    req: &SpriteRunRequest<'_>,
) -> Result<(String, bool), WreckitError> {
    let (vm_name, ephemeral) = match req.vm_name {
        Some(pinned) => (pinned.to_string(), false),
        None => (
            format!(
                "wreckit-sandbox-{}-{}",
                req.item_id,
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis()
            ),
            true,
        ),
    };

    let existing = cli.list_vms().await?;
    if !existing.iter().any(|v| v == &vm_name) {
        cli.start_vm(&vm_name, req.memory_mb, req.cpus).await?;
    }
    if ephemeral {
        OwnedVmPointer::global().set(Some(vm_name.clone()));
    }

    push_project(cli, &vm_name, req.project_dir, &config.exclude_patterns).await?;

    Ok((vm_name, ephemeral))
}

async fn push_project(
    cli: &SandboxCli,
    vm_name: &str,
    project_dir: &Path,
    exclude_patterns: &[String],
) -> Result<(), WreckitError> {
    let mut args = vec!["-czf".to_string(), "-".to_string(), "-C".to_string()];
    args.push(project_dir.display().to_string());
    for pattern in exclude_patterns {
        args.push(format!("--exclude={pattern}"));
    }
    args.push(".".to_string());

    let output = Command::new("tar")
        .args(&args)
        .stdout(Stdio::piped())
        .output()
        .await
        .map_err(|e| WreckitError::SandboxError {
            kind: SandboxErrorKind::SyncFailed,
            message: format!("failed to tar project for push: {e}"),
        })?;
    if !output.status.success() {
        return Err(WreckitError::SandboxError {
            kind: SandboxErrorKind::SyncFailed,
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let result = cli
        .exec_in_vm(
            vm_name,
            &["tar", "-xzf", "-", "-C", VM_ROOT],
            Some(&output.stdout),
        )
        .await?;
    if !result.success() {
        return Err(WreckitError::SandboxError {
            kind: SandboxErrorKind::SyncFailed,
            message: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }
    Ok(())
}

/// Step 5: pull the project back out of the VM after a successful turn. A
/// pull failure logs and is swallowed — the run still counts as a success
/// (spec §4.4 "Failure semantics").
pub async fn pull_project(cli: &SandboxCli, vm_name: &str, project_dir: &Path) {
    let result = cli
        .exec_in_vm(vm_name, &["sh", "-c", &format!("tar -czC {VM_ROOT} . | base64")], None)
        .await;

    let encoded = match result {
        Ok(r) if r.success() => r.stdout,
        Ok(r) => {
            tracing::warn!(
                vm = vm_name,
                stderr = %String::from_utf8_lossy(&r.stderr),
                "pull from sandbox VM returned non-zero exit"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(vm = vm_name, error = %e, "pull from sandbox VM failed");
            return;
        }
    };

    let decoded = match base64::engine::general_purpose::STANDARD.decode(
        String::from_utf8_lossy(&encoded).trim(),
    ) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(vm = vm_name, error = %e, "failed to base64-decode pulled archive");
            return;
        }
    };

    let mut child = match Command::new("tar")
        .args(["-xz", "-C"])
        .arg(project_dir)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(error = %e, "failed to spawn local tar for pull extraction");
            return;
        }
    };
    if let Some(mut stdin) = child.stdin.take() {
        use tokio::io::AsyncWriteExt;
        let _ = stdin.write_all(&decoded).await;
        let _ = stdin.shutdown().await;
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(error = %e, "local tar extraction for pull failed");
    }
}

/// Step 6: unconditional teardown. Never raises; errors are logged.
pub async fn teardown(cli: &SandboxCli, vm_name: &str, ephemeral: bool) {
    if ephemeral {
        cli.kill_vm(vm_name).await.ok();
    }
    OwnedVmPointer::global().set(None);
}

/// Pure config transformation for `--sandbox` override (spec §4.4
/// "Sandbox mode"): forces sprite, clears any pinned VM name so the run is
/// ephemeral, and applies the configured default memory/CPUs.
pub fn sandbox_override(config: &SandboxConfig) -> AgentConfig {
    AgentConfig::Sprite {
        vm_name: None,
        memory_mb: config.default_memory_mb,
        cpus: config.default_cpus,
        sync_enabled: true,
        sync_on_success: true,
    }
}

/// Outcome bookkeeping helper so callers can persist a `Session` record
/// once the run has either completed or failed.
pub fn session_for_outcome(
    session_id: String,
    vm_name: String,
    item_id: String,
    succeeded: bool,
    error: Option<String>,
) -> Session {
    let mut session = Session::start(session_id, vm_name, item_id);
    if succeeded {
        session.complete();
    } else {
        session.fail(error.unwrap_or_else(|| "sprite run failed".to_string()));
        session.state = SessionState::Failed;
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_override_forces_sprite_and_clears_vm_name() {
        let config = SandboxConfig {
            cli_path: "sprite".to_string(),
            default_memory_mb: 4096,
            default_cpus: 4,
            vm_op_timeout_seconds: 300,
            exclude_patterns: vec![".git".into()],
        };
        let agent_config = sandbox_override(&config);
        match agent_config {
            AgentConfig::Sprite {
                vm_name,
                memory_mb,
                cpus,
                sync_enabled,
                sync_on_success,
            } => {
                assert!(vm_name.is_none());
                assert_eq!(memory_mb, 4096);
                assert_eq!(cpus, 4);
                assert!(sync_enabled);
                assert!(sync_on_success);
            }
            _ => panic!("expected Sprite variant"),
        }
    }

    #[test]
    fn owned_vm_pointer_round_trips() {
        let pointer = OwnedVmPointer::default();
        assert!(pointer.current().is_none());
        pointer.set(Some("wreckit-sandbox-001-1".to_string()));
        assert_eq!(pointer.current(), Some("wreckit-sandbox-001-1".to_string()));
        pointer.set(None);
        assert!(pointer.current().is_none());
    }

    #[test]
    fn session_for_outcome_records_failure() {
        let session = session_for_outcome(
            "sess-1".to_string(),
            "vm".to_string(),
            "item".to_string(),
            false,
            Some("boom".to_string()),
        );
        assert_eq!(session.state, SessionState::Failed);
        assert_eq!(session.error.as_deref(), Some("boom"));
    }
}
