//! Orchestrator (spec §4.6, C6): the dependency-aware, capacity-bounded
//! scheduler that advances many items concurrently.

pub mod dependency;
pub mod runnability;
pub mod scheduler;
pub mod session;

pub use dependency::DependencyGraph;
pub use runnability::{runnability, select_runnable, Runnability};
pub use scheduler::{run_to_quiescence, ItemRunOutcome, ItemRunSummary, SchedulerConfig};
pub use session::{OrchestratorSession, ResumeOutcome};
