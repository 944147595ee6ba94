//! `wreckit sprite list|kill`: direct sandbox VM lifecycle management
//! (spec §4.4), bypassing the agent runtime for manual cleanup.

use anyhow::Result;

use crate::sandbox::vm::SandboxCli;

use super::CliContext;

pub async fn list(ctx: &CliContext) -> Result<()> {
    let cli = SandboxCli::new(&ctx.config.sandbox)?;
    let vms = cli.list_vms().await?;
    if vms.is_empty() {
        println!("no active sandbox VMs");
    } else {
        for name in vms {
            println!("{name}");
        }
    }
    Ok(())
}

pub async fn kill(ctx: &CliContext, name: &str) -> Result<()> {
    let cli = SandboxCli::new(&ctx.config.sandbox)?;
    cli.kill_vm(name).await?;
    println!("killed {name}");
    Ok(())
}
