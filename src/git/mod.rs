//! Git operations module
//!
//! This module provides a trait-based interface for git operations,
//! replacing shell-based git commands with proper libgit2 bindings.

pub mod checks;
pub mod operations;
pub mod remote;

pub use operations::{Git2Operations, GitOperations};
pub use remote::{OctocrabPrDriver, PrDriver, PrStatus};
