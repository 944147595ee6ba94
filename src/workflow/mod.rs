//! Workflow Engine (spec §4.5, C5): drives one item through its state
//! chain via a pure transition validator plus a phase executor that wires
//! in the Agent Runtime, Git Integration, and Artifact Store. Grounded on
//! `workflows/state_machine.rs` and
//! `autonomous/workflow_state_machine.rs`, rebuilt as a pure function per
//! this system's explicit requirement that `applyStateTransition` never
//! mutate its input.

pub mod executor;
pub mod state;

pub use state::{ItemState, Phase, ValidationContext};
