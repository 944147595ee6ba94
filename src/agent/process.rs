//! Local subprocess agent variant (spec §4.3.2 "Process" backend).
//! Grounded on `agents/process_manager.rs`'s discipline: spawn with piped
//! stdio and `kill_on_drop(true)`, stream output line by line, escalate
//! SIGTERM then SIGKILL on timeout or cancellation.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Duration;

use crate::agent::allowlist;
use crate::agent::{AgentConfig, AgentResult, AgentVariant, RunAgentOpts};
use crate::error::{AgentErrorKind, WreckitError};

/// How often the run loop checks `opts.is_cancelled()` while waiting on
/// child output (spec §4.3.4 "cancellation is cooperative, checked between
/// output chunks").
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Grace period between SIGTERM and SIGKILL (`process_manager.rs`
/// terminates with a plain SIGTERM; this variant adds
/// the escalation spec §4.3.4 requires for a cooperative-but-bounded
/// shutdown).
const SIGTERM_GRACE: Duration = Duration::from_secs(5);

pub struct ProcessVariant;

#[async_trait]
impl AgentVariant for ProcessVariant {
    async fn run(&self, opts: &RunAgentOpts) -> Result<AgentResult, WreckitError> {
        let AgentConfig::Process {
            command,
            args,
            completion_signal,
        } = &opts.agent_config
        else {
            return Err(WreckitError::AgentFailed {
                kind: AgentErrorKind::Unknown,
                message: "ProcessVariant invoked with non-process agent config".to_string(),
            });
        };

        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(&opts.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| WreckitError::AgentFailed {
            kind: AgentErrorKind::Unknown,
            message: format!("failed to spawn '{command}': {e}"),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            let _ = stdin.write_all(opts.prompt.as_bytes()).await;
            let _ = stdin.shutdown().await;
        }

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let started_at = Instant::now();
        let mut output = String::new();
        let mut completion_detected = false;
        let mut timed_out = false;
        let mut cancelled = false;

        loop {
            if started_at.elapsed().as_secs() >= opts.timeout_seconds {
                timed_out = true;
                break;
            }
            if opts.is_cancelled() {
                cancelled = true;
                break;
            }

            tokio::select! {
                line = stdout_lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if line.contains(completion_signal.as_str()) {
                                completion_detected = true;
                            }
                            output.push_str(&line);
                            output.push('\n');
                            // Best-effort tool-call interception: a process
                            // variant has no native allowlist, so any JSON
                            // tool-use frame is checked here (spec §4.3.3).
                            if let Some(tool_name) = parse_tool_use_name(&line) {
                                if let Err(e) = allowlist::check_tool(&opts.allowed_tools, &tool_name) {
                                    return Ok(AgentResult::failed(AgentErrorKind::ToolDenied, e.to_string()));
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            return Ok(AgentResult::failed(
                                AgentErrorKind::Unknown,
                                format!("stdout read error: {e}"),
                            ));
                        }
                    }
                }
                line = stderr_lines.next_line() => {
                    if let Ok(Some(line)) = line {
                        if let Some(sink) = &opts.on_stderr_chunk {
                            sink(&line);
                        }
                    }
                }
                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {}
            }
        }

        if timed_out || cancelled {
            terminate_gracefully(&mut child).await;
            if cancelled {
                return Ok(AgentResult::failed(
                    AgentErrorKind::Unknown,
                    "agent turn cancelled",
                ));
            }
            return Ok(AgentResult {
                success: false,
                completion_detected: false,
                exit_code: None,
                timed_out: true,
                iterations: 1,
                duration_seconds: started_at.elapsed().as_secs_f64(),
                files_modified: Vec::new(),
                output,
                session_id: None,
                error: Some(crate::agent::AgentResultError {
                    kind: AgentErrorKind::LimitExceeded,
                    message: format!("timed out after {}s", opts.timeout_seconds),
                }),
            });
        }

        let status = child.wait().await.map_err(|e| WreckitError::AgentFailed {
            kind: AgentErrorKind::Unknown,
            message: format!("failed to wait on child: {e}"),
        })?;

        Ok(AgentResult {
            success: status.success(),
            completion_detected,
            exit_code: status.code(),
            timed_out: false,
            iterations: 1,
            duration_seconds: started_at.elapsed().as_secs_f64(),
            files_modified: Vec::new(),
            output,
            session_id: None,
            error: if status.success() {
                None
            } else {
                Some(crate::agent::AgentResultError {
                    kind: AgentErrorKind::Unknown,
                    message: format!("process exited with {status}"),
                })
            },
        })
    }
}

async fn terminate_gracefully(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let _ = std::process::Command::new("kill")
                .arg("-TERM")
                .arg(pid.to_string())
                .output();
        }
        if tokio::time::timeout(SIGTERM_GRACE, child.wait())
            .await
            .is_err()
        {
            let _ = child.kill().await;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill().await;
    }
}

/// Best-effort extraction of `{"type":"tool_use","name":"..."}` frames from
/// a line of agent stdout, for variants that must intercept tool calls
/// themselves rather than relying on native filtering (spec §4.3.3).
fn parse_tool_use_name(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("type")?.as_str()? != "tool_use" {
        return None;
    }
    value.get("name")?.as_str().map(str::to_string)
}
