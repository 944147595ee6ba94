//! Limits & Sessions (spec §4.8, C8): per-agent-turn resource caps and the
//! counters that enforce them. Grounded on
//! `agents/process_manager.rs`'s `ResourceLimits`, generalized from
//! process-level memory/CPU ceilings to the turn-level iteration/duration/
//! budget ceilings spec §4.8 actually asks for.

use std::time::Instant;

use crate::config::LimitsConfig;
use crate::error::{AgentErrorKind, WreckitError};

/// Live counters tracked across one agent turn (or, for the Orchestrator,
/// across a whole item's lifetime within a session).
#[derive(Debug, Clone)]
pub struct LimitTracker {
    pub limits: LimitsConfig,
    iterations: u32,
    progress_steps: u32,
    spent_dollars: f64,
    started_at: Instant,
}

/// Which configured ceiling was crossed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Iterations,
    Duration,
    ProgressSteps,
    Budget,
}

impl LimitTracker {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            iterations: 0,
            progress_steps: 0,
            spent_dollars: 0.0,
            started_at: Instant::now(),
        }
    }

    pub fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn record_progress_step(&mut self) {
        self.progress_steps += 1;
    }

    pub fn record_spend(&mut self, dollars: f64) {
        self.spent_dollars += dollars;
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Returns the first ceiling crossed, if any. Checked in the order spec
    /// §4.8 lists them: iterations, duration, progress steps, budget.
    pub fn exceeded(&self) -> Option<LimitKind> {
        if self.iterations >= self.limits.max_iterations {
            return Some(LimitKind::Iterations);
        }
        if self.elapsed_seconds() >= self.limits.max_duration_seconds as f64 {
            return Some(LimitKind::Duration);
        }
        if self.progress_steps >= self.limits.max_progress_steps {
            return Some(LimitKind::ProgressSteps);
        }
        if let Some(max_budget) = self.limits.max_budget_dollars {
            if self.spent_dollars >= max_budget {
                return Some(LimitKind::Budget);
            }
        }
        None
    }

    /// Convenience for call sites that just want to bail with the crate's
    /// error type the moment any ceiling is crossed.
    pub fn check(&self) -> Result<(), WreckitError> {
        match self.exceeded() {
            None => Ok(()),
            Some(kind) => Err(WreckitError::AgentFailed {
                kind: AgentErrorKind::LimitExceeded,
                message: format!("{kind:?} limit exceeded"),
            }),
        }
    }
}
