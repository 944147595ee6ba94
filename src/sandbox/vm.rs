//! Primitives wrapping an external VM CLI (spec §4.4 "Primitives").
//! Grounded on `agents/process_manager.rs`'s spawn/stdio discipline and
//! `git/checks.rs`'s bounded-timeout subprocess pattern, applied to a
//! `sprite`-style CLI instead of a local agent process.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::SandboxConfig;
use crate::error::{SandboxErrorKind, WreckitError};

#[derive(Debug, Clone)]
pub struct VmExecResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl VmExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Thin wrapper over the `sprite`-style VM CLI binary named by
/// `SandboxConfig.cli_path`. Every call is bounded by
/// `vm_op_timeout_seconds`; a missing binary or missing `SPRITES_TOKEN`
/// fails fast rather than hanging on the first real call (spec §4.4
/// "fail fast if the CLI binary is missing or SPRITES_TOKEN unresolved").
pub struct SandboxCli {
    cli_path: String,
    timeout: Duration,
}

impl SandboxCli {
    pub fn new(config: &SandboxConfig) -> Result<Self, WreckitError> {
        if which(&config.cli_path).is_none() {
            return Err(WreckitError::SandboxError {
                kind: SandboxErrorKind::CliMissing,
                message: format!("sandbox CLI binary '{}' not found on PATH", config.cli_path),
            });
        }
        if std::env::var("SPRITES_TOKEN").is_err() {
            return Err(WreckitError::SandboxError {
                kind: SandboxErrorKind::TokenMissing,
                message: "SPRITES_TOKEN is not set".to_string(),
            });
        }
        Ok(Self {
            cli_path: config.cli_path.clone(),
            timeout: Duration::from_secs(config.vm_op_timeout_seconds),
        })
    }

    pub async fn start_vm(&self, name: &str, memory_mb: u64, cpus: u32) -> Result<(), WreckitError> {
        let result = self
            .run(&[
                "vm",
                "start",
                name,
                "--memory",
                &memory_mb.to_string(),
                "--cpus",
                &cpus.to_string(),
            ])
            .await?;
        if !result.success() {
            return Err(WreckitError::SandboxError {
                kind: SandboxErrorKind::StartFailed,
                message: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }
        Ok(())
    }

    /// Execute `argv` inside the named VM, optionally piping `stdin_bytes`
    /// in. Used for both tool-call translation and tarball sync (spec §4.4
    /// step 4/5).
    pub async fn exec_in_vm(
        &self,
        name: &str,
        argv: &[&str],
        stdin_bytes: Option<&[u8]>,
    ) -> Result<VmExecResult, WreckitError> {
        let mut args = vec!["vm".to_string(), "exec".to_string(), name.to_string(), "--".to_string()];
        args.extend(argv.iter().map(|s| s.to_string()));
        self.run_with_stdin(&args, stdin_bytes).await
    }

    pub async fn list_vms(&self) -> Result<Vec<String>, WreckitError> {
        let result = self.run(&["vm", "list", "--json"]).await?;
        let names: Vec<String> = serde_json::from_slice(&result.stdout).unwrap_or_default();
        Ok(names)
    }

    pub async fn kill_vm(&self, name: &str) -> Result<(), WreckitError> {
        // Teardown errors are logged, never raised (spec §4.4 "Failure
        // semantics").
        match self.run(&["vm", "kill", name]).await {
            Ok(result) if !result.success() => {
                tracing::warn!(vm = name, "killVM returned non-zero exit during teardown");
            }
            Err(e) => {
                tracing::warn!(vm = name, error = %e, "killVM failed during teardown");
            }
            _ => {}
        }
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<VmExecResult, WreckitError> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.run_with_stdin(&owned, None).await
    }

    async fn run_with_stdin(
        &self,
        args: &[String],
        stdin_bytes: Option<&[u8]>,
    ) -> Result<VmExecResult, WreckitError> {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| WreckitError::SandboxError {
            kind: SandboxErrorKind::StartFailed,
            message: format!("failed to spawn sandbox CLI: {e}"),
        })?;

        if let Some(bytes) = stdin_bytes {
            use tokio::io::AsyncWriteExt;
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(bytes).await;
                let _ = stdin.shutdown().await;
            }
        } else {
            child.stdin.take();
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| WreckitError::Timeout {
                operation: format!("sandbox exec {args:?}"),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| WreckitError::SandboxError {
                kind: SandboxErrorKind::StartFailed,
                message: format!("sandbox CLI process error: {e}"),
            })?;

        Ok(VmExecResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

fn which(binary: &str) -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
