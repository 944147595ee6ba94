//! JIT skill context loader (spec §4.5.3 step 2 "JIT-built skill context —
//! a separate read-only subsystem"). Skills are pinned as a collaborator:
//! this crate specifies only the contract the Workflow Engine consumes —
//! a bundle of declared tools plus rendered context text — not how skills
//! are authored or discovered on disk.

use serde::{Deserialize, Serialize};

use crate::workflow::state::Phase;

/// One loaded skill: the tools it declares (augmenting, never widening,
/// the phase allowlist — spec §4.3.3) and context text to splice into the
/// rendered prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub tools: Vec<String>,
    pub context: String,
}

/// Read-only surface the executor calls to gather skills applicable to a
/// phase. The concrete loader (filesystem discovery, remote registry, …)
/// is out of scope; this trait is the pin.
#[cfg_attr(test, mockall::automock)]
pub trait SkillLoader: Send + Sync {
    fn load_for_phase(&self, phase: Phase) -> Vec<Skill>;
}

/// A loader with no skills configured; the default when no skill registry
/// is wired in.
pub struct NoSkills;

impl SkillLoader for NoSkills {
    fn load_for_phase(&self, _phase: Phase) -> Vec<Skill> {
        Vec::new()
    }
}

/// Union of every declared tool across a set of loaded skills, for the
/// allowlist union step (spec §4.5.3 step 3).
pub fn union_tools(skills: &[Skill]) -> Vec<String> {
    let mut tools: Vec<String> = skills.iter().flat_map(|s| s.tools.clone()).collect();
    tools.sort();
    tools.dedup();
    tools
}

/// Concatenation of every loaded skill's context, in load order, ready to
/// splice into a rendered prompt.
pub fn render_context(skills: &[Skill]) -> String {
    skills
        .iter()
        .map(|s| s.context.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
