// Wreckit - autonomous software-engineering workflow engine.
// Exposes the core components for the CLI binary and for integration tests.

pub mod agent;
pub mod artifact;
pub mod config;
pub mod doctor;
pub mod error;
pub mod git;
pub mod limits;
pub mod orchestrator;
pub mod prompts;
pub mod sandbox;
pub mod shutdown;
pub mod skills;
pub mod telemetry;
pub mod workflow;

pub mod cli;

// Re-export key types for easy access.
pub use agent::{run_agent, AgentConfig, AgentResult, AgentVariant, RunAgentOpts};
pub use artifact::{BatchProgress, FsArtifactStore, Index, IndexItem, Item, Prd, UserStory};
pub use config::WreckitConfig;
pub use error::WreckitError;
pub use git::{Git2Operations, GitOperations, OctocrabPrDriver, PrDriver, PrStatus};
pub use orchestrator::{
    select_runnable, DependencyGraph, OrchestratorSession, ResumeOutcome, Runnability,
    SchedulerConfig,
};
pub use doctor::{run_diagnostics, Diagnostic, DiagnosticCode, DiagnosticReport};
pub use sandbox::{SandboxCli, Session as SandboxSession, SessionState};
pub use shutdown::ShutdownCoordinator;
pub use telemetry::init_telemetry;
pub use workflow::{ItemState, Phase, ValidationContext};
