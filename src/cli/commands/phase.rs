//! `wreckit research|plan|implement|critique|pr|run`: drive exactly one
//! phase of one item through the executor (spec §4.5.3).

use anyhow::{Context, Result};

use crate::workflow::executor::execute_phase;
use crate::workflow::state::Phase;

use super::{no_skills, plain_renderer, CliContext};

pub async fn run_named_phase(ctx: &CliContext, item_id: &str, phase: Phase) -> Result<()> {
    let outcome = execute_phase(
        &ctx.store,
        &ctx.git,
        &plain_renderer(),
        &no_skills(),
        ctx.config.default_agent_config(),
        item_id,
        phase,
        ctx.config.agent.timeout_seconds,
        false,
    )
    .await
    .with_context(|| format!("{phase:?} failed for {item_id}"))?;

    match outcome.advanced_to {
        Some(state) => println!("{item_id}: advanced to {state:?}"),
        None => println!(
            "{item_id}: blocked — {}",
            outcome.blocked_reason.unwrap_or_else(|| "unknown reason".to_string())
        ),
    }
    Ok(())
}

/// `wreckit run <item>`: look up the item's current state and dispatch
/// whichever phase is due next (spec's `Phase::for_state`).
pub async fn run_due_phase(ctx: &CliContext, item_id: &str) -> Result<()> {
    let item = ctx.store.read_item(item_id)?;
    let phase = Phase::for_state(item.state).ok_or_else(|| {
        anyhow::anyhow!(
            "{item_id} is in state {:?}, which has no phase to run next",
            item.state
        )
    })?;
    run_named_phase(ctx, item_id, phase).await
}
