//! `wreckit orchestrate`: run the scheduler to quiescence (spec §4.6.2).

use anyhow::Result;

use crate::orchestrator::runnability::select_runnable;
use crate::orchestrator::scheduler::{run_to_quiescence, ItemRunOutcome, SchedulerConfig};

use super::{no_skills, plain_renderer, start_session, CliContext};

pub async fn run(ctx: &CliContext, parallel: Option<usize>, dry_run: bool) -> Result<()> {
    let parallel = parallel.unwrap_or(ctx.config.orchestrator.parallel).max(1);

    let items = ctx.store.scan_items()?;
    let queued: Vec<String> = select_runnable(&items, &Default::default(), &Default::default());
    let session = start_session(&ctx.store, queued, parallel)?;

    let config = SchedulerConfig {
        parallel,
        timeout_seconds: ctx.config.agent.timeout_seconds,
        auto_repair: ctx.config.orchestrator.auto_repair,
        max_retries: ctx.config.orchestrator.max_retries,
        dry_run,
        agent_config: ctx.config.default_agent_config(),
    };

    let summaries = run_to_quiescence(
        &ctx.store,
        &ctx.git,
        &plain_renderer(),
        &no_skills(),
        &session,
        &config,
    )
    .await?;

    let mut advanced = 0;
    let mut failed = 0;
    for summary in &summaries {
        match &summary.outcome {
            ItemRunOutcome::Advanced => {
                advanced += 1;
                println!("{}: advanced", summary.item_id);
            }
            ItemRunOutcome::Failed(reason) => {
                failed += 1;
                println!("{}: failed — {reason}", summary.item_id);
            }
        }
    }
    println!("orchestration finished: {advanced} advanced, {failed} failed");
    Ok(())
}
