//! Agent Runtime (spec §4.3, C3): a uniform `run_agent` contract over
//! heterogeneous backends — local subprocess, in-process SDK, and the
//! sandboxed VM variant. Grounded on
//! `agent_lifecycle/executor.rs`'s single-entry-point dispatch and
//! `agents/process_manager.rs` spawn/timeout/cleanup discipline.

pub mod allowlist;
pub mod cancellation;
pub mod process;
pub mod sdk;
pub mod sprite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AgentErrorKind, WreckitError};
use crate::limits::LimitTracker;

/// Tagged union over agent backends (spec §4.3.1 `agentConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentConfig {
    Process {
        command: String,
        args: Vec<String>,
        completion_signal: String,
    },
    ClaudeSdk {
        model: String,
        max_tokens: Option<u64>,
    },
    AmpSdk {
        model: String,
        max_tokens: Option<u64>,
    },
    CodexSdk {
        model: String,
        max_tokens: Option<u64>,
    },
    OpencodeSdk {
        model: String,
        max_tokens: Option<u64>,
    },
    Rlm {
        model: String,
        max_tokens: Option<u64>,
    },
    Sprite {
        vm_name: Option<String>,
        memory_mb: u64,
        cpus: u32,
        sync_enabled: bool,
        sync_on_success: bool,
    },
}

impl AgentConfig {
    pub fn default_for_kind(kind: &str) -> Self {
        match kind {
            "claude_sdk" => AgentConfig::ClaudeSdk {
                model: "claude-default".to_string(),
                max_tokens: None,
            },
            "amp_sdk" => AgentConfig::AmpSdk {
                model: "amp-default".to_string(),
                max_tokens: None,
            },
            "codex_sdk" => AgentConfig::CodexSdk {
                model: "codex-default".to_string(),
                max_tokens: None,
            },
            "opencode_sdk" => AgentConfig::OpencodeSdk {
                model: "opencode-default".to_string(),
                max_tokens: None,
            },
            "rlm" => AgentConfig::Rlm {
                model: "rlm-default".to_string(),
                max_tokens: None,
            },
            "sprite" => AgentConfig::Sprite {
                vm_name: None,
                memory_mb: 2048,
                cpus: 2,
                sync_enabled: true,
                sync_on_success: true,
            },
            _ => AgentConfig::Process {
                command: "claude-code".to_string(),
                args: Vec::new(),
                completion_signal: "DONE".to_string(),
            },
        }
    }

    /// Accepts the legacy `{mode, command, args, completion_signal}` shape
    /// as an alias for `kind = process` (spec §6 "Agent configuration").
    pub fn from_legacy_mode(
        mode: &str,
        command: String,
        args: Vec<String>,
        completion_signal: String,
    ) -> Option<Self> {
        if mode == "process" || mode == "local" {
            Some(AgentConfig::Process {
                command,
                args,
                completion_signal,
            })
        } else {
            None
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AgentConfig::Process { .. } => "process",
            AgentConfig::ClaudeSdk { .. } => "claude_sdk",
            AgentConfig::AmpSdk { .. } => "amp_sdk",
            AgentConfig::CodexSdk { .. } => "codex_sdk",
            AgentConfig::OpencodeSdk { .. } => "opencode_sdk",
            AgentConfig::Rlm { .. } => "rlm",
            AgentConfig::Sprite { .. } => "sprite",
        }
    }

    /// Whether this variant can natively filter tool calls against an
    /// allowlist, vs needing the runtime to intercept (spec §4.3.3, §9 open
    /// question). SDK variants are modeled as native-capable; process and
    /// sprite are intercepted.
    pub fn supports_native_tool_filtering(&self) -> bool {
        matches!(
            self,
            AgentConfig::ClaudeSdk { .. }
                | AgentConfig::AmpSdk { .. }
                | AgentConfig::CodexSdk { .. }
                | AgentConfig::OpencodeSdk { .. }
        )
    }
}

/// Streaming sinks consumed by the TUI/CLI layer. Pure functions of their
/// inputs — per spec §9 they must never call back into the runtime.
pub type StdoutSink = Arc<dyn Fn(&str) + Send + Sync>;
pub type StderrSink = Arc<dyn Fn(&str) + Send + Sync>;
pub type EventSink = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolUse { name: String, input: serde_json::Value },
    ToolResult { name: String, output: String },
    Message { text: String },
    Error { message: String },
}

pub struct RunAgentOpts {
    pub agent_config: AgentConfig,
    pub cwd: PathBuf,
    pub prompt: String,
    pub allowed_tools: Option<Vec<String>>,
    pub mcp_servers: Vec<String>,
    pub timeout_seconds: u64,
    pub limits: Option<LimitTracker>,
    pub dry_run: bool,
    pub mock_agent: bool,
    pub env: HashMap<String, String>,
    pub on_stdout_chunk: Option<StdoutSink>,
    pub on_stderr_chunk: Option<StderrSink>,
    pub on_agent_event: Option<EventSink>,
    pub cancellation: Option<Arc<cancellation::CancellationHandle>>,
}

impl RunAgentOpts {
    pub fn new(agent_config: AgentConfig, cwd: PathBuf, prompt: String) -> Self {
        Self {
            agent_config,
            cwd,
            prompt,
            allowed_tools: None,
            mcp_servers: Vec::new(),
            timeout_seconds: 1800,
            limits: None,
            dry_run: false,
            mock_agent: false,
            env: HashMap::new(),
            on_stdout_chunk: None,
            on_stderr_chunk: None,
            on_agent_event: None,
            cancellation: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|h| h.is_cancelled())
            .unwrap_or(false)
    }

    fn emit_stdout(&self, chunk: &str) {
        if let Some(sink) = &self.on_stdout_chunk {
            sink(chunk);
        }
    }

    fn emit_stderr(&self, chunk: &str) {
        if let Some(sink) = &self.on_stderr_chunk {
            sink(chunk);
        }
    }

    fn emit_event(&self, event: &AgentEvent) {
        if let Some(sink) = &self.on_agent_event {
            sink(event);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    pub completion_detected: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub iterations: u32,
    pub duration_seconds: f64,
    pub files_modified: Vec<String>,
    pub output: String,
    pub session_id: Option<String>,
    pub error: Option<AgentResultError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResultError {
    pub kind: AgentErrorKind,
    pub message: String,
}

impl AgentResult {
    pub fn dry_run(allowed_tools: &Option<Vec<String>>) -> Self {
        let tools_desc = allowed_tools
            .as_ref()
            .map(|t| t.join(", "))
            .unwrap_or_else(|| "unrestricted".to_string());
        AgentResult {
            success: true,
            completion_detected: true,
            exit_code: Some(0),
            timed_out: false,
            iterations: 0,
            duration_seconds: 0.0,
            files_modified: Vec::new(),
            output: format!("[dry-run] would run with allowed tools: {tools_desc}"),
            session_id: None,
            error: None,
        }
    }

    pub fn mock() -> Self {
        AgentResult {
            success: true,
            completion_detected: true,
            exit_code: Some(0),
            timed_out: false,
            iterations: 1,
            duration_seconds: 0.01,
            files_modified: Vec::new(),
            output: "[mock-agent] deterministic fake output".to_string(),
            session_id: None,
            error: None,
        }
    }

    pub fn failed(kind: AgentErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        AgentResult {
            success: false,
            completion_detected: false,
            exit_code: None,
            timed_out: matches!(kind, AgentErrorKind::LimitExceeded),
            iterations: 0,
            duration_seconds: 0.0,
            files_modified: Vec::new(),
            output: String::new(),
            session_id: None,
            error: Some(AgentResultError {
                kind,
                message,
            }),
        }
    }
}

/// Trait every execution variant implements; `run_agent` dispatches to one
/// of these based on `opts.agent_config`. Mockable via `testing` feature for
/// the Workflow Engine's own unit tests.
#[async_trait]
pub trait AgentVariant: Send + Sync {
    async fn run(&self, opts: &RunAgentOpts) -> Result<AgentResult, WreckitError>;
}

/// Entry point for spec §4.3.1: run one agent turn and return its result.
/// Dry-run and mock modes short-circuit before any side effect, including
/// tool-allowlist derivation and sandbox/git interaction (spec §4.3.5).
pub async fn run_agent(opts: RunAgentOpts) -> Result<AgentResult, WreckitError> {
    if opts.dry_run {
        tracing::info!(
            kind = opts.agent_config.kind_name(),
            allowed_tools = ?opts.allowed_tools,
            "dry-run: skipping agent execution"
        );
        return Ok(AgentResult::dry_run(&opts.allowed_tools));
    }
    if opts.mock_agent {
        tracing::info!(kind = opts.agent_config.kind_name(), "mock-agent: returning deterministic result");
        return Ok(AgentResult::mock());
    }

    let guard = cancellation::Registry::global().register();
    let mut opts = opts;
    opts.cancellation = Some(guard.handle());

    match &opts.agent_config {
        AgentConfig::Process { .. } => process::ProcessVariant.run(&opts).await,
        AgentConfig::ClaudeSdk { .. }
        | AgentConfig::AmpSdk { .. }
        | AgentConfig::CodexSdk { .. }
        | AgentConfig::OpencodeSdk { .. }
        | AgentConfig::Rlm { .. } => sdk::SdkVariant.run(&opts).await,
        AgentConfig::Sprite { .. } => sprite::SpriteVariant.run(&opts).await,
    }
    // `guard` drops here, unregistering the handle even if the variant
    // above returned an error.
}
