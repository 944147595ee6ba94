//! `wreckit doctor [--fix]`: diagnose and optionally repair store
//! inconsistencies (spec §4.7).

use anyhow::Result;

use crate::doctor::backup::BackupSession;
use crate::doctor::diagnostics::run_diagnostics;
use crate::doctor::fixes::apply_fixes;

use super::CliContext;

pub fn run(ctx: &CliContext, fix: bool) -> Result<()> {
    let diagnostics = run_diagnostics(&ctx.store);

    if diagnostics.is_empty() {
        println!("no issues found");
        return Ok(());
    }

    for d in &diagnostics {
        let scope = d.item_id.as_deref().unwrap_or("<store>");
        println!(
            "[{:?}] {:?} {scope}: {} (fixable: {})",
            d.severity, d.code, d.message, d.fixable
        );
    }

    if !fix {
        println!("\nrun with --fix to repair the fixable diagnostics above");
        return Ok(());
    }

    let session_id = format!("doctor-{}", std::process::id());
    let mut backups = BackupSession::open(ctx.store.root(), &session_id)?;
    let outcomes = apply_fixes(&ctx.store, &mut backups, &diagnostics);

    println!("\napplied {} fix(es):", outcomes.len());
    for outcome in &outcomes {
        match &outcome.error {
            None => println!("  {} on {:?}: ok", outcome.diagnostic_code, outcome.item_id),
            Some(err) => println!("  {} on {:?}: FAILED — {err}", outcome.diagnostic_code, outcome.item_id),
        }
    }
    Ok(())
}
