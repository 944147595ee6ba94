//! Tool allowlist derivation and enforcement (spec §4.3.3).
//!
//! The effective allowlist is: explicit `allowedTools` if the caller passed
//! one, else the phase-derived default, else unrestricted (`None`). Skills
//! may augment the tool set, but the effective set is always the
//! intersection with the phase allowlist — never a superset.

use std::collections::HashSet;

use crate::error::{AgentErrorKind, WreckitError};
use crate::workflow::state::Phase;

/// Phase-derived default tool sets (spec §4.3.3 examples).
pub fn phase_default_tools(phase: Phase) -> Vec<String> {
    match phase {
        Phase::Research => vec!["Read", "Glob", "Grep", "Write"],
        Phase::Plan => vec!["Read", "Glob", "Grep", "Write"],
        Phase::Implement => vec!["Read", "Write", "Glob", "Grep", "Bash", "Edit"],
        Phase::Critique => vec!["Read", "Glob", "Grep"],
        Phase::Pr => vec!["Read", "Glob", "Grep", "Bash"],
    }
    .into_iter()
    .map(String::from)
    .collect()
}

/// Compute the effective allowlist for a phase invocation.
///
/// `explicit` wins outright. Otherwise the phase default is unioned with any
/// skill-declared tools, then intersected back against the phase default —
/// skills can never widen what a phase is allowed to touch.
pub fn effective_allowlist(
    phase: Phase,
    explicit: Option<Vec<String>>,
    skill_tools: &[String],
) -> Option<Vec<String>> {
    if let Some(tools) = explicit {
        return Some(tools);
    }

    let phase_default: HashSet<String> = phase_default_tools(phase).into_iter().collect();
    let augmented: HashSet<String> = phase_default
        .iter()
        .cloned()
        .chain(skill_tools.iter().cloned())
        .collect();
    let effective: HashSet<String> = augmented.intersection(&phase_default).cloned().collect();

    let mut tools: Vec<String> = effective.into_iter().collect();
    tools.sort();
    Some(tools)
}

/// Check one tool invocation against the effective allowlist. `None` means
/// unrestricted. Used by variants that must intercept tool calls themselves
/// (spec §4.3.3 "For variants without native support").
pub fn check_tool(allowlist: &Option<Vec<String>>, tool: &str) -> Result<(), WreckitError> {
    match allowlist {
        None => Ok(()),
        Some(tools) if tools.iter().any(|t| t == tool) => Ok(()),
        Some(_) => Err(WreckitError::AgentFailed {
            kind: AgentErrorKind::ToolDenied,
            message: format!("tool '{tool}' is not in the effective allowlist"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_allowlist_wins_over_phase_default() {
        let explicit = Some(vec!["Bash".to_string()]);
        let result = effective_allowlist(Phase::Research, explicit, &[]);
        assert_eq!(result, Some(vec!["Bash".to_string()]));
    }

    #[test]
    fn phase_default_applies_without_explicit() {
        let result = effective_allowlist(Phase::Research, None, &[]).unwrap();
        assert!(result.contains(&"Read".to_string()));
        assert!(!result.contains(&"Bash".to_string()));
    }

    #[test]
    fn skill_tools_never_widen_effective_set() {
        let skill_tools = vec!["Bash".to_string(), "Read".to_string()];
        let result = effective_allowlist(Phase::Research, None, &skill_tools).unwrap();
        // Bash is not in the research phase default, so it must not appear
        // even though the skill declared it.
        assert!(!result.contains(&"Bash".to_string()));
        assert!(result.contains(&"Read".to_string()));
    }

    #[test]
    fn check_tool_allows_listed_tool() {
        let allowlist = Some(vec!["Read".to_string()]);
        assert!(check_tool(&allowlist, "Read").is_ok());
    }

    #[test]
    fn check_tool_denies_unlisted_tool() {
        let allowlist = Some(vec!["Read".to_string()]);
        let err = check_tool(&allowlist, "Bash").unwrap_err();
        match err {
            WreckitError::AgentFailed { kind, .. } => assert_eq!(kind, AgentErrorKind::ToolDenied),
            _ => panic!("expected AgentFailed"),
        }
    }

    #[test]
    fn check_tool_unrestricted_when_none() {
        assert!(check_tool(&None, "AnyTool").is_ok());
    }
}
