//! Sandbox Backend (spec §4.4, C4): ephemeral microVM lifecycle with
//! bi-directional project sync, plugged into the Agent Runtime as the
//! `sprite` variant. No existing module owns this shape directly; it is
//! grounded on the *process-management* discipline of
//! `agents/process_manager.rs` (spawn, bounded timeout, guaranteed
//! teardown) applied to an external VM CLI instead of a local process.

pub mod lifecycle;
pub mod session;
pub mod vm;

pub use session::{Session, SessionState};
pub use vm::{SandboxCli, VmExecResult};
