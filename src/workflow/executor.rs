//! Phase executor (spec §4.5.3): the exact eight-step sequence that drives
//! one phase of one item. Wires together the Artifact Store, Agent
//! Runtime, Git Integration, skills, and prompts behind the pure
//! transition validator in [`super::state`].

use std::collections::HashSet;

use crate::agent::{allowlist, run_agent, AgentConfig, RunAgentOpts};
use crate::artifact::item::Item;
use crate::artifact::store::FsArtifactStore;
use crate::error::WreckitError;
use crate::git::operations::GitOperations;
use crate::prompts::PromptRenderer;
use crate::skills::{self, SkillLoader};
use crate::workflow::state::{
    apply_state_transition, CritiqueVerdict, ItemState, Phase, TransitionResult, ValidationContext,
};

/// Which directories a phase may write to (spec §4.5.3 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// research/plan/prd phases: only the item's own directory.
    ItemDirOnly,
    /// implement phase: anywhere in the repo.
    Unrestricted,
    /// media-writing turns: only `.wreckit/media/`.
    MediaOnly,
}

impl Phase {
    pub fn write_policy(self) -> WritePolicy {
        match self {
            Phase::Research | Phase::Plan => WritePolicy::ItemDirOnly,
            Phase::Implement => WritePolicy::Unrestricted,
            Phase::Critique | Phase::Pr => WritePolicy::ItemDirOnly,
        }
    }
}

#[derive(Debug)]
pub struct WriteRootViolation {
    pub paths: Vec<String>,
}

/// Check changed paths against a phase's write policy (spec §4.5.3 step 7).
pub fn check_write_roots(
    item_id: &str,
    policy: WritePolicy,
    changed_paths: &HashSet<String>,
) -> Option<WriteRootViolation> {
    let violating: Vec<String> = match policy {
        WritePolicy::Unrestricted => Vec::new(),
        WritePolicy::ItemDirOnly => {
            let prefix = format!("items/{item_id}/");
            changed_paths
                .iter()
                .filter(|p| !p.starts_with(&prefix))
                .cloned()
                .collect()
        }
        WritePolicy::MediaOnly => changed_paths
            .iter()
            .filter(|p| !p.starts_with(".wreckit/media/"))
            .cloned()
            .collect(),
    };

    if violating.is_empty() {
        None
    } else {
        Some(WriteRootViolation { paths: violating })
    }
}

pub struct PhaseExecutionOutcome {
    pub advanced_to: Option<crate::workflow::state::ItemState>,
    pub blocked_reason: Option<String>,
}

/// Build a [`ValidationContext`] from the current on-disk artifacts (spec
/// §4.5.3 step 8).
pub fn build_validation_context(
    store: &FsArtifactStore,
    item: &Item,
    critique_verdict: Option<CritiqueVerdict>,
) -> ValidationContext {
    let item_dir = store.root().join("items").join(&item.id);
    let prd = store.read_prd(&item.id).ok().map(|p| p.to_validation_summary());

    ValidationContext {
        has_research_md: item_dir.join("research.md").exists(),
        has_plan_md: item_dir.join("plan.md").exists(),
        prd,
        has_pr: item.pr_url.is_some() || item.pr_number.is_some(),
        pr_merged: item.merged_at.is_some() || item.rollback_sha.is_some(),
        critique_verdict,
    }
}

/// Drive exactly one phase of one item through the eight-step sequence.
/// `agent_config` is the runtime-resolved variant to dispatch this turn to
/// (spec §4.3.1/§4.4 — `WreckitConfig::default_agent_config` resolves
/// `config.agent.default_kind` into this, so the SDK and Sprite variants are
/// actually reachable rather than every call hardcoding the process backend).
#[allow(clippy::too_many_arguments)]
pub async fn execute_phase(
    store: &FsArtifactStore,
    git: &dyn GitOperations,
    renderer: &dyn PromptRenderer,
    skill_loader: &dyn SkillLoader,
    agent_config: AgentConfig,
    item_id: &str,
    phase: Phase,
    timeout_seconds: u64,
    dry_run: bool,
) -> Result<PhaseExecutionOutcome, WreckitError> {
    let item = store.read_item(item_id)?;

    // Step 1: validate current state matches the phase's input state.
    if item.state != phase.input_state() {
        return Err(WreckitError::ValidationFailed {
            from: format!("{:?}", item.state),
            to: format!("{phase:?}"),
            reason: "item state does not match phase input state (WrongState)".to_string(),
        });
    }

    // Step 2: render the phase prompt against the item plus skill context.
    let loaded_skills = skill_loader.load_for_phase(phase);
    let skill_context = skills::render_context(&loaded_skills);
    let prompt = renderer.render(phase, &item, &skill_context);

    // Step 3: derive the allowlist; union with skill tools, intersect with
    // the phase allowlist.
    let skill_tools = skills::union_tools(&loaded_skills);
    let effective_allowlist = allowlist::effective_allowlist(phase, None, &skill_tools);

    // Step 4: snapshot git status for post-hoc write-root enforcement.
    let before = git.snapshot_status()?;

    // Step 5: invoke the agent.
    let cwd = store.root().to_path_buf();
    let mut opts = RunAgentOpts::new(agent_config, cwd, prompt);
    opts.allowed_tools = effective_allowlist;
    opts.timeout_seconds = timeout_seconds;
    opts.dry_run = dry_run;

    let result = run_agent(opts).await?;

    // Step 6: on non-success, record last_error and do not advance.
    if !result.success {
        let mut failed_item = item.clone();
        failed_item.last_error = result
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .or_else(|| Some("agent turn did not succeed".to_string()));
        store.write_item(&failed_item)?;
        store.append_progress_log(
            item_id,
            &format!("{phase:?} phase failed: {}", failed_item.last_error.as_deref().unwrap_or("")),
        )?;
        return Ok(PhaseExecutionOutcome {
            advanced_to: None,
            blocked_reason: failed_item.last_error,
        });
    }

    // Step 7: diff git status; enforce the phase's write policy.
    let changed = git.diff_status(&before)?;
    if let Some(violation) = check_write_roots(item_id, phase.write_policy(), &changed) {
        let mut failed_item = item.clone();
        failed_item.last_error = Some(format!(
            "write-root violation: phase touched {:?} outside its allowed roots",
            violation.paths
        ));
        store.write_item(&failed_item)?;
        return Ok(PhaseExecutionOutcome {
            advanced_to: None,
            blocked_reason: failed_item.last_error,
        });
    }

    // Step 8: build the validation context, apply the transition, persist.
    //
    // The critique phase is the one place a single agent turn drives two
    // chained hops: Implementing -> Critique is mechanical (stories done,
    // PR open), and the adversarial verdict from that same turn then
    // resolves Critique -> InPr (approved) or Critique -> Planned
    // (rejected, spec §4.5.4) without a separate phase invocation, since no
    // phase's input state is `Critique` itself.
    if phase == Phase::Critique {
        let (verdict, reason, critique_text) = match parse_critique_output(&result.output) {
            Ok(parsed) => parsed,
            Err(e) => {
                let mut failed_item = item.clone();
                failed_item.last_error = Some(e.to_string());
                store.write_item(&failed_item)?;
                return Ok(PhaseExecutionOutcome {
                    advanced_to: None,
                    blocked_reason: failed_item.last_error,
                });
            }
        };

        let ctx = build_validation_context(store, &item, Some(verdict));
        let first_hop = apply_state_transition(item.state, &ctx);
        let TransitionResult::Advanced {
            next: ItemState::Critique,
            ..
        } = first_hop
        else {
            let reason = match first_hop {
                TransitionResult::Blocked { reason } => reason,
                TransitionResult::Advanced { next, .. } => {
                    format!("unexpected first hop out of critique phase into {next:?}")
                }
            };
            let mut failed_item = item.clone();
            failed_item.last_error = Some(reason.clone());
            store.write_item(&failed_item)?;
            return Ok(PhaseExecutionOutcome {
                advanced_to: None,
                blocked_reason: Some(reason),
            });
        };

        return match apply_state_transition(ItemState::Critique, &ctx) {
            TransitionResult::Advanced { next, transition } => {
                let mut advanced_item = item.clone();
                advanced_item.state = next;
                advanced_item.last_error = None;
                store.write_item(&advanced_item)?;
                store.append_progress_log(
                    item_id,
                    &format!(
                        "{:?} -> {:?} via critique phase ({reason}): {critique_text}",
                        transition.0, transition.1
                    ),
                )?;
                Ok(PhaseExecutionOutcome {
                    advanced_to: Some(next),
                    blocked_reason: None,
                })
            }
            TransitionResult::Blocked { reason } => {
                let mut failed_item = item.clone();
                failed_item.last_error = Some(reason.clone());
                store.write_item(&failed_item)?;
                Ok(PhaseExecutionOutcome {
                    advanced_to: None,
                    blocked_reason: Some(reason),
                })
            }
        };
    }

    let ctx = build_validation_context(store, &item, None);
    match apply_state_transition(item.state, &ctx) {
        TransitionResult::Advanced { next, transition } => {
            let mut advanced_item = item.clone();
            advanced_item.state = next;
            advanced_item.last_error = None;
            store.write_item(&advanced_item)?;
            store.append_progress_log(
                item_id,
                &format!("{:?} -> {:?} via {phase:?} phase", transition.0, transition.1),
            )?;
            Ok(PhaseExecutionOutcome {
                advanced_to: Some(next),
                blocked_reason: None,
            })
        }
        TransitionResult::Blocked { reason } => {
            let mut failed_item = item.clone();
            failed_item.last_error = Some(reason.clone());
            store.write_item(&failed_item)?;
            Ok(PhaseExecutionOutcome {
                advanced_to: None,
                blocked_reason: Some(reason),
            })
        }
    }
}

/// Drive the critique phase's loop (spec §4.5.4): a malformed critique
/// output is treated as a failure with no state change, rather than a
/// `Blocked` transition.
pub fn parse_critique_output(raw: &str) -> Result<(CritiqueVerdict, String, String), WreckitError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| {
        WreckitError::ValidationFailed {
            from: "implementing".to_string(),
            to: "critique".to_string(),
            reason: "critique output is not valid JSON".to_string(),
        }
    })?;

    let status = value
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WreckitError::ValidationFailed {
            from: "implementing".to_string(),
            to: "critique".to_string(),
            reason: "critique output missing 'status'".to_string(),
        })?;

    let verdict = match status {
        "approved" => CritiqueVerdict::Approved,
        "rejected" => CritiqueVerdict::Rejected,
        other => {
            return Err(WreckitError::ValidationFailed {
                from: "implementing".to_string(),
                to: "critique".to_string(),
                reason: format!("unrecognized critique status '{other}'"),
            })
        }
    };

    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let critique = value
        .get("critique")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok((verdict, reason, critique))
}
