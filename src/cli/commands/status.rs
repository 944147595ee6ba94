//! `wreckit status`: one line per item with its current state.

use anyhow::Result;

use super::CliContext;

pub fn run(ctx: &CliContext) -> Result<()> {
    let items = ctx.store.scan_items()?;
    if items.is_empty() {
        println!("no items filed yet — run 'wreckit idea <title>' to file one");
        return Ok(());
    }

    println!("{:<28} {:<14} TITLE", "ID", "STATE");
    for item in &items {
        println!("{:<28} {:<14} {}", item.id, format!("{:?}", item.state), item.title);
    }
    Ok(())
}
