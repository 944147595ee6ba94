use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "wreckit")]
#[command(about = "Autonomous software-engineering workflow engine")]
#[command(long_about = "Wreckit drives work items through research, planning, \
implementation, critique, and PR — one phase at a time, or continuously via \
'wreckit orchestrate'. Get started with 'wreckit idea' to file your first item.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the artifact store root (defaults to the current directory).
    #[arg(long, global = true)]
    pub root: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// File a new work item.
    Idea {
        title: String,
        #[arg(long)]
        campaign: Option<String>,
    },
    /// Run the research phase for an item.
    Research { item: String },
    /// Run the planning phase for an item.
    Plan { item: String },
    /// Run the implementation phase for an item.
    Implement { item: String },
    /// Run the critique phase for an item.
    Critique { item: String },
    /// Run the PR phase for an item.
    Pr { item: String },
    /// Advance a single item through whichever phase it's due for next.
    Run { item: String },
    /// Continuously advance every runnable item until none remain.
    Orchestrate {
        #[arg(long)]
        parallel: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a summary of every item and its current state.
    Status,
    /// Show one item's full detail.
    Show { item: String },
    /// Diagnose (and optionally repair) store inconsistencies.
    Doctor {
        #[arg(long)]
        fix: bool,
    },
    /// Sandbox VM lifecycle management.
    Sprite {
        #[command(subcommand)]
        command: SpriteCommands,
    },
}

#[derive(Subcommand)]
pub enum SpriteCommands {
    /// List active sandbox VMs.
    List,
    /// Tear down a named sandbox VM.
    Kill { name: String },
}
