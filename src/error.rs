//! Crate-wide error taxonomy (spec §7 "Error Handling Design").
//!
//! Library code returns `Result<T, WreckitError>`; CLI command handlers wrap
//! these in `anyhow::Result` and attach user-facing context, mirroring the
//! split already present between `GitHubError` (typed) and the
//! `anyhow`-based command layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AgentErrorKind {
    #[error("authentication failed")]
    Auth,
    #[error("rate limited")]
    RateLimit,
    #[error("context window exceeded")]
    ContextLimit,
    #[error("network error")]
    Network,
    #[error("limit exceeded")]
    LimitExceeded,
    #[error("tool denied by allowlist")]
    ToolDenied,
    #[error("agent produced no usable response")]
    AgentNonresponse,
    #[error("unknown agent error")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GitErrorKind {
    #[error("working tree is dirty")]
    DirtyTree,
    #[error("branch already exists")]
    BranchExists,
    #[error("merge conflict")]
    MergeConflict,
    #[error("remote refused the operation")]
    RemoteRefused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SandboxErrorKind {
    #[error("sandbox CLI binary missing")]
    CliMissing,
    #[error("sandbox auth token missing")]
    TokenMissing,
    #[error("VM failed to start")]
    StartFailed,
    #[error("project sync failed")]
    SyncFailed,
}

#[derive(Debug, Error)]
pub enum WreckitError {
    #[error("invalid artifact at {path}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("ambiguous id '{query}' matched {candidates:?}")]
    AmbiguousId {
        query: String,
        candidates: Vec<String>,
    },

    #[error("no item matching '{query}'")]
    NotFound { query: String },

    #[error("transition {from} -> {to} rejected: {reason}")]
    ValidationFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("agent failed: {kind} ({message})")]
    AgentFailed {
        kind: AgentErrorKind,
        message: String,
    },

    #[error("git error: {kind} ({message})")]
    GitError { kind: GitErrorKind, message: String },

    #[error("sandbox error: {kind} ({message})")]
    SandboxError {
        kind: SandboxErrorKind,
        message: String,
    },

    #[error("doctor repair failed: {0}")]
    DoctorFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("dependency cycle detected among: {items:?}")]
    CyclicDependency { items: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// Git operations report failures as `anyhow::Error` (spec §4.2's
    /// primitives wrap git2's error surface); this folds them into the
    /// crate's typed taxonomy at the Workflow Engine boundary.
    #[error("git operation failed: {0}")]
    GitOperation(#[from] anyhow::Error),
}

impl WreckitError {
    pub fn invalid_artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for error kinds a `doctor --fix` pass might plausibly heal
    /// (spec §4.7.3 "known healable signature").
    pub fn is_healable_signature(&self) -> bool {
        matches!(
            self,
            WreckitError::InvalidArtifact { .. }
                | WreckitError::GitError {
                    kind: GitErrorKind::DirtyTree,
                    ..
                }
        )
    }
}
