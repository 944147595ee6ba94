//! `wreckit idea`: file a new raw item (spec §3 "Item", §4.6.4 dependency
//! inference at creation time).

use anyhow::Result;

use crate::artifact::item::Item;
use crate::artifact::prd::Prd;

use super::CliContext;

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn next_id(ctx: &CliContext, title: &str) -> Result<String> {
    let items = ctx.store.scan_items()?;
    let next_num = items
        .iter()
        .filter_map(|i| i.id.split('-').next().and_then(|s| s.parse::<u32>().ok()))
        .max()
        .unwrap_or(0)
        + 1;
    Ok(format!("{next_num:03}-{}", slugify(title)))
}

pub fn run(ctx: &CliContext, title: &str, campaign: Option<&str>) -> Result<()> {
    let id = next_id(ctx, title)?;

    // Linear dependency chain within a campaign (spec §4.6.4): each new
    // item depends on the campaign's previously-filed item, if any.
    let depends_on = campaign
        .and_then(|c| {
            ctx.store
                .read_all_items()
                .ok()?
                .into_iter()
                .filter(|i| i.campaign.as_deref() == Some(c))
                .max_by_key(|i| i.id.clone())
                .map(|i| vec![i.id])
        })
        .unwrap_or_default();

    let mut item = Item::new(&id, title, "unclassified");
    item.campaign = campaign.map(str::to_string);
    item.depends_on = depends_on;
    ctx.store.write_item(&item)?;
    ctx.store.write_prd(&Prd::new(&id))?;

    println!("Filed {id}: {title}");
    Ok(())
}
