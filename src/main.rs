use anyhow::Result;
use clap::Parser;

mod agent;
mod artifact;
mod cli;
mod config;
mod doctor;
mod error;
mod git;
mod limits;
mod orchestrator;
mod prompts;
mod sandbox;
mod shutdown;
mod skills;
mod telemetry;
mod workflow;

use cli::commands::{doctor as doctor_cmd, idea, orchestrate, phase, show, sprite, status};
use cli::{Cli, Commands, SpriteCommands};
use config::WreckitConfig;
use shutdown::ShutdownCoordinator;
use telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = WreckitConfig::load_env_file() {
        eprintln!("warning: failed to load .env file: {e}");
    }

    if let Err(e) = init_telemetry() {
        eprintln!("warning: failed to initialize telemetry: {e}");
    }

    let shutdown = ShutdownCoordinator::new();
    let _signal_handle = shutdown.install();

    let cli = Cli::parse();
    let result = run_command(cli).await;

    telemetry::shutdown_telemetry();
    result
}

async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        None => {
            println!("Wreckit — autonomous software-engineering workflow engine");
            println!();
            println!("  wreckit idea <title>     file a new item");
            println!("  wreckit run <item>       advance an item one phase");
            println!("  wreckit orchestrate      advance every runnable item to quiescence");
            println!("  wreckit status           list every item and its state");
            println!("  wreckit doctor --fix     diagnose and repair store inconsistencies");
            Ok(())
        }
        Some(Commands::Idea { title, campaign }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            idea::run(&ctx, &title, campaign.as_deref())
        }
        Some(Commands::Research { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_named_phase(&ctx, &item, workflow::state::Phase::Research).await
        }
        Some(Commands::Plan { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_named_phase(&ctx, &item, workflow::state::Phase::Plan).await
        }
        Some(Commands::Implement { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_named_phase(&ctx, &item, workflow::state::Phase::Implement).await
        }
        Some(Commands::Critique { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_named_phase(&ctx, &item, workflow::state::Phase::Critique).await
        }
        Some(Commands::Pr { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_named_phase(&ctx, &item, workflow::state::Phase::Pr).await
        }
        Some(Commands::Run { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            phase::run_due_phase(&ctx, &item).await
        }
        Some(Commands::Orchestrate { parallel, dry_run }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            orchestrate::run(&ctx, parallel, dry_run).await
        }
        Some(Commands::Status) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            status::run(&ctx)
        }
        Some(Commands::Show { item }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            show::run(&ctx, &item)
        }
        Some(Commands::Doctor { fix }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            doctor_cmd::run(&ctx, fix)
        }
        Some(Commands::Sprite { command }) => {
            let ctx = cli::commands::open_context(cli.root.as_deref())?;
            match command {
                SpriteCommands::List => sprite::list(&ctx).await,
                SpriteCommands::Kill { name } => sprite::kill(&ctx, &name).await,
            }
        }
    }
}
