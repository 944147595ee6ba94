//! `wreckit show <item>`: full detail for one item plus its PRD.

use anyhow::Result;

use super::CliContext;

pub fn run(ctx: &CliContext, item_id: &str) -> Result<()> {
    let item = ctx.store.read_item(item_id)?;
    println!("{} — {}", item.id, item.title);
    println!("state: {:?}", item.state);
    if let Some(campaign) = &item.campaign {
        println!("campaign: {campaign}");
    }
    if !item.depends_on.is_empty() {
        println!("depends_on: {}", item.depends_on.join(", "));
    }
    if let Some(branch) = &item.branch {
        println!("branch: {branch}");
    }
    if let Some(pr_url) = &item.pr_url {
        println!("pr: {pr_url}");
    }
    if let Some(reason) = &item.last_error {
        println!("last_error: {reason}");
    }

    if let Ok(prd) = ctx.store.read_prd(item_id) {
        println!("\nuser stories ({}):", prd.user_stories.len());
        for story in &prd.user_stories {
            println!(
                "  [{}] {:?} p{} {}",
                story.id, story.status, story.priority, story.title
            );
        }
    }
    Ok(())
}
