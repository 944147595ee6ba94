//! Phase prompt template contract (spec §4.5.3 step 2 "Load the phase
//! prompt template and render it against the item"). Template rendering
//! itself is an external collaborator (spec §1 "Out of scope: prompt
//! template rendering"); this module pins the minimal interface the
//! Workflow Engine calls against.

use crate::artifact::item::Item;
use crate::workflow::state::Phase;

/// Renders a phase's prompt template against an item plus skill context.
/// The concrete template source (files on disk, embedded strings, a
/// template registry) is out of scope; callers provide an implementation.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, phase: Phase, item: &Item, skill_context: &str) -> String;
}

/// A renderer that emits a plain, deterministic prompt with no templating
/// engine — useful for dry runs, tests, and as a fallback when no richer
/// renderer is configured.
pub struct PlainPromptRenderer;

impl PromptRenderer for PlainPromptRenderer {
    fn render(&self, phase: Phase, item: &Item, skill_context: &str) -> String {
        let phase_name = match phase {
            Phase::Research => "research",
            Phase::Plan => "plan",
            Phase::Implement => "implement",
            Phase::Critique => "critique",
            Phase::Pr => "pr",
        };
        let mut prompt = format!(
            "# {phase_name} phase for {id}: {title}\n\n{overview}\n",
            id = item.id,
            title = item.title,
            overview = item.overview,
        );
        if !skill_context.is_empty() {
            prompt.push_str("\n## Skill context\n\n");
            prompt.push_str(skill_context);
            prompt.push('\n');
        }
        prompt
    }
}
