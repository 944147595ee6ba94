//! Item state chain and pure transition validation (spec §4.5.1, §4.5.2).

use serde::{Deserialize, Serialize};

/// `raw -> researched -> planned -> implementing -> critique -> in_pr -> done`.
/// `done` is absorbing; every successful transition advances the index by
/// exactly one (except the explicit critique-rejection loop back to
/// `planned`, which is a distinct, non-advancing edge, not a "skip").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Raw,
    Researched,
    Planned,
    Implementing,
    Critique,
    InPr,
    Done,
}

impl ItemState {
    pub fn index(self) -> u8 {
        match self {
            ItemState::Raw => 0,
            ItemState::Researched => 1,
            ItemState::Planned => 2,
            ItemState::Implementing => 3,
            ItemState::Critique => 4,
            ItemState::InPr => 5,
            ItemState::Done => 6,
        }
    }

    /// `None` iff `self == Done` (spec §4.5.1 `getNextState`).
    pub fn next(self) -> Option<ItemState> {
        match self {
            ItemState::Raw => Some(ItemState::Researched),
            ItemState::Researched => Some(ItemState::Planned),
            ItemState::Planned => Some(ItemState::Implementing),
            ItemState::Implementing => Some(ItemState::Critique),
            ItemState::Critique => Some(ItemState::InPr),
            ItemState::InPr => Some(ItemState::Done),
            ItemState::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ItemState::Done
    }
}

/// The phase driven by one agent turn (spec §4.3.3, §4.5.3, glossary
/// "Phase"). Each phase's input state is the state it's invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Research,
    Plan,
    Implement,
    Critique,
    Pr,
}

impl Phase {
    /// The state a phase expects to find the item in before it runs.
    pub fn input_state(self) -> ItemState {
        match self {
            Phase::Research => ItemState::Raw,
            Phase::Plan => ItemState::Researched,
            Phase::Implement => ItemState::Planned,
            Phase::Critique => ItemState::Implementing,
            Phase::Pr => ItemState::InPr,
        }
    }

    /// The phase due to run next for an item currently in `state`, if any.
    /// `Critique` never appears here: it is a transient waypoint the
    /// critique phase passes through and out of within a single call (see
    /// `workflow::executor::execute_phase`), never a resting state a
    /// scheduler needs to dispatch work for.
    pub fn for_state(state: ItemState) -> Option<Phase> {
        match state {
            ItemState::Raw => Some(Phase::Research),
            ItemState::Researched => Some(Phase::Plan),
            ItemState::Planned => Some(Phase::Implement),
            ItemState::Implementing => Some(Phase::Critique),
            ItemState::Critique => None,
            ItemState::InPr => Some(Phase::Pr),
            ItemState::Done => None,
        }
    }
}

/// Minimal PRD story shape the validator needs; the full PRD model lives in
/// the Artifact Store (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: String,
    pub done: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PrdSummary {
    pub stories: Vec<StorySummary>,
}

impl PrdSummary {
    pub fn has_stories(&self) -> bool {
        !self.stories.is_empty()
    }

    pub fn any_pending(&self) -> bool {
        self.stories.iter().any(|s| !s.done)
    }

    pub fn all_done(&self) -> bool {
        !self.stories.is_empty() && self.stories.iter().all(|s| s.done)
    }
}

/// Inputs to transition validation, built fresh from on-disk artifacts at
/// each phase boundary (spec §4.5.2, §4.5.3 step 8).
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub has_research_md: bool,
    pub has_plan_md: bool,
    pub prd: Option<PrdSummary>,
    pub has_pr: bool,
    pub pr_merged: bool,
    /// Set only when the critique phase just ran (spec §4.5.4).
    pub critique_verdict: Option<CritiqueVerdict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CritiqueVerdict {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// The outcome of `applyStateTransition`: either the item's next state (and
/// which transition produced it), or a reason it could not advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Advanced {
        next: ItemState,
        transition: (ItemState, ItemState),
    },
    Blocked {
        reason: String,
    },
}

/// Evaluate the precondition for `current -> target` (spec §4.5.2 table).
/// A pure function: no I/O, no mutation, callers supply everything via `ctx`.
pub fn validate_transition(
    current: ItemState,
    target: ItemState,
    ctx: &ValidationContext,
) -> ValidationOutcome {
    use ItemState::*;

    match (current, target) {
        (Raw, Researched) => {
            if ctx.has_research_md {
                ValidationOutcome::ok()
            } else {
                ValidationOutcome::fail("research.md does not exist")
            }
        }
        (Researched, Planned) => {
            let prd_ok = ctx.prd.as_ref().is_some_and(PrdSummary::has_stories);
            if ctx.has_plan_md && prd_ok {
                ValidationOutcome::ok()
            } else if !ctx.has_plan_md {
                ValidationOutcome::fail("plan.md does not exist")
            } else {
                ValidationOutcome::fail("prd has no stories")
            }
        }
        (Planned, Implementing) => {
            let prd_ok = ctx
                .prd
                .as_ref()
                .is_some_and(|p| p.has_stories() && p.any_pending());
            if prd_ok {
                ValidationOutcome::ok()
            } else {
                ValidationOutcome::fail("prd has no stories or none are pending")
            }
        }
        (Implementing, Critique) => {
            let all_done = ctx.prd.as_ref().is_some_and(PrdSummary::all_done);
            if all_done && ctx.has_pr {
                ValidationOutcome::ok()
            } else if !all_done {
                ValidationOutcome::fail("not all stories are done")
            } else {
                ValidationOutcome::fail("no pr recorded")
            }
        }
        (Critique, InPr) => match ctx.critique_verdict {
            Some(CritiqueVerdict::Approved) => ValidationOutcome::ok(),
            Some(CritiqueVerdict::Rejected) => {
                ValidationOutcome::fail("critique rejected, loop back to planned")
            }
            None => ValidationOutcome::fail("no critique verdict recorded"),
        },
        (InPr, Done) => {
            if ctx.pr_merged {
                ValidationOutcome::ok()
            } else {
                ValidationOutcome::fail("pr is not merged and no direct-merge sha recorded")
            }
        }
        _ => ValidationOutcome::fail(format!(
            "{current:?} -> {target:?} is not a recognized transition"
        )),
    }
}

/// Pure application of the next transition for `current`'s state (spec
/// §4.5.2 `applyStateTransition`). Returns `Blocked` with a reason instead
/// of mutating anything; callers persist the new state themselves.
///
/// The critique-rejection edge is the one place the "chain" loops backward:
/// it is handled explicitly here rather than via `ItemState::next`, since
/// `next` only models forward progress.
pub fn apply_state_transition(current: ItemState, ctx: &ValidationContext) -> TransitionResult {
    if current == ItemState::Critique {
        return match ctx.critique_verdict {
            Some(CritiqueVerdict::Approved) => TransitionResult::Advanced {
                next: ItemState::InPr,
                transition: (ItemState::Critique, ItemState::InPr),
            },
            Some(CritiqueVerdict::Rejected) => TransitionResult::Advanced {
                next: ItemState::Planned,
                transition: (ItemState::Critique, ItemState::Planned),
            },
            None => TransitionResult::Blocked {
                reason: "no critique verdict recorded".to_string(),
            },
        };
    }

    let Some(target) = current.next() else {
        return TransitionResult::Blocked {
            reason: "item is already done".to_string(),
        };
    };

    let outcome = validate_transition(current, target, ctx);
    if outcome.valid {
        TransitionResult::Advanced {
            next: target,
            transition: (current, target),
        }
    } else {
        TransitionResult::Blocked {
            reason: outcome.reason.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_chain_is_monotonic_and_done_is_absorbing() {
        assert_eq!(ItemState::Raw.next(), Some(ItemState::Researched));
        assert_eq!(ItemState::InPr.next(), Some(ItemState::Done));
        assert_eq!(ItemState::Done.next(), None);
        assert!(ItemState::Done.is_terminal());
    }

    #[test]
    fn for_state_has_no_dispatchable_phase_for_critique_or_done() {
        assert_eq!(Phase::for_state(ItemState::Raw), Some(Phase::Research));
        assert_eq!(Phase::for_state(ItemState::InPr), Some(Phase::Pr));
        assert_eq!(Phase::for_state(ItemState::Critique), None);
        assert_eq!(Phase::for_state(ItemState::Done), None);
    }

    #[test]
    fn raw_to_researched_requires_research_md() {
        let ctx = ValidationContext::default();
        let outcome = validate_transition(ItemState::Raw, ItemState::Researched, &ctx);
        assert!(!outcome.valid);

        let ctx = ValidationContext {
            has_research_md: true,
            ..Default::default()
        };
        let outcome = validate_transition(ItemState::Raw, ItemState::Researched, &ctx);
        assert!(outcome.valid);
    }

    #[test]
    fn researched_to_planned_requires_plan_md_and_stories() {
        let ctx = ValidationContext {
            has_plan_md: true,
            prd: Some(PrdSummary {
                stories: vec![StorySummary {
                    id: "S1".into(),
                    done: false,
                }],
            }),
            ..Default::default()
        };
        assert!(validate_transition(ItemState::Researched, ItemState::Planned, &ctx).valid);

        let ctx_empty_prd = ValidationContext {
            has_plan_md: true,
            prd: Some(PrdSummary::default()),
            ..Default::default()
        };
        assert!(!validate_transition(ItemState::Researched, ItemState::Planned, &ctx_empty_prd).valid);
    }

    #[test]
    fn implementing_to_critique_requires_all_stories_done_and_pr() {
        let done_prd = PrdSummary {
            stories: vec![StorySummary {
                id: "S1".into(),
                done: true,
            }],
        };
        let ctx = ValidationContext {
            prd: Some(done_prd.clone()),
            has_pr: true,
            ..Default::default()
        };
        assert!(validate_transition(ItemState::Implementing, ItemState::Critique, &ctx).valid);

        let ctx_no_pr = ValidationContext {
            prd: Some(done_prd),
            has_pr: false,
            ..Default::default()
        };
        assert!(!validate_transition(ItemState::Implementing, ItemState::Critique, &ctx_no_pr).valid);
    }

    #[test]
    fn apply_state_transition_does_not_advance_when_blocked() {
        let ctx = ValidationContext::default();
        let result = apply_state_transition(ItemState::Raw, &ctx);
        match result {
            TransitionResult::Blocked { reason } => {
                assert!(reason.contains("research.md"))
            }
            _ => panic!("expected Blocked"),
        }
    }

    #[test]
    fn apply_state_transition_advances_on_satisfied_precondition() {
        let ctx = ValidationContext {
            has_research_md: true,
            ..Default::default()
        };
        let result = apply_state_transition(ItemState::Raw, &ctx);
        assert_eq!(
            result,
            TransitionResult::Advanced {
                next: ItemState::Researched,
                transition: (ItemState::Raw, ItemState::Researched),
            }
        );
    }

    #[test]
    fn critique_approved_advances_to_in_pr() {
        let ctx = ValidationContext {
            critique_verdict: Some(CritiqueVerdict::Approved),
            ..Default::default()
        };
        let result = apply_state_transition(ItemState::Critique, &ctx);
        assert_eq!(
            result,
            TransitionResult::Advanced {
                next: ItemState::InPr,
                transition: (ItemState::Critique, ItemState::InPr),
            }
        );
    }

    #[test]
    fn critique_rejected_loops_back_to_planned() {
        let ctx = ValidationContext {
            critique_verdict: Some(CritiqueVerdict::Rejected),
            ..Default::default()
        };
        let result = apply_state_transition(ItemState::Critique, &ctx);
        assert_eq!(
            result,
            TransitionResult::Advanced {
                next: ItemState::Planned,
                transition: (ItemState::Critique, ItemState::Planned),
            }
        );
    }

    #[test]
    fn done_never_advances() {
        let ctx = ValidationContext::default();
        let result = apply_state_transition(ItemState::Done, &ctx);
        assert!(matches!(result, TransitionResult::Blocked { .. }));
    }

    #[test]
    fn phase_input_states_match_chain() {
        assert_eq!(Phase::Research.input_state(), ItemState::Raw);
        assert_eq!(Phase::Pr.input_state(), ItemState::InPr);
    }
}
