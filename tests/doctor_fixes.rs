//! Integration tests for the Doctor's diagnose-then-fix pass: real
//! diagnostics run against a deliberately broken temp-directory store, real
//! fixes applied under a real `BackupSession`, and the on-disk result
//! re-read to confirm each repair actually landed.

use tempfile::tempdir;

use wreckit::artifact::item::Item;
use wreckit::artifact::prd::{Prd, StoryStatus, UserStory};
use wreckit::artifact::store::FsArtifactStore;
use wreckit::doctor::backup::BackupSession;
use wreckit::doctor::diagnostics::{run_diagnostics, DiagnosticCode};
use wreckit::doctor::fixes::apply_fixes;
use wreckit::workflow::state::ItemState;

fn broken_priority_story(id: &str) -> UserStory {
    UserStory {
        id: id.to_string(),
        title: "story".to_string(),
        acceptance_criteria: vec![],
        priority: 9,
        status: StoryStatus::Pending,
        notes: String::new(),
        branch_name: "b".to_string(),
    }
}

#[test]
fn diagnose_then_fix_repairs_every_fixable_finding_in_one_pass() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    // Item claims to be planned but has no plan.md, and its PRD carries an
    // out-of-range story priority and no top-level id/branch_name.
    let mut item = Item::new("001-foo", "Foo", "cli");
    item.state = ItemState::Planned;
    store.write_item(&item).unwrap();
    std::fs::write(dir.path().join("items/001-foo/research.md"), "notes").unwrap();

    let mut prd = Prd::new("001-foo");
    prd.id = None;
    prd.branch_name = None;
    prd.user_stories.push(broken_priority_story("US-001"));
    store.write_prd(&prd).unwrap();

    let diagnostics = run_diagnostics(&store);
    assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::StateFileMismatch));
    assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::PrdMissingId));
    assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::PrdMissingBranchName));
    assert!(diagnostics.iter().any(|d| d.code == DiagnosticCode::PrdInvalidPriority));

    let mut backups = BackupSession::open(dir.path(), "heal-001").unwrap();
    let outcomes = apply_fixes(&store, &mut backups, &diagnostics);
    assert!(outcomes.iter().all(|o| o.applied), "{outcomes:?}");

    let healed_item = store.read_item("001-foo").unwrap();
    assert_eq!(healed_item.state, ItemState::Researched);

    let healed_prd = store.read_prd("001-foo").unwrap();
    assert_eq!(healed_prd.id.as_deref(), Some("001-foo"));
    assert_eq!(healed_prd.branch_name.as_deref(), Some("wreckit/001-foo"));
    assert_eq!(healed_prd.user_stories[0].priority, 4);

    // Every mutated file was backed up before the repair touched it.
    assert_eq!(backups.manifest().entries.len(), 4);

    let re_diagnosed = run_diagnostics(&store);
    assert!(!re_diagnosed.iter().any(|d| d.code == DiagnosticCode::StateFileMismatch));
    assert!(!re_diagnosed.iter().any(|d| d.code == DiagnosticCode::PrdMissingId));
}

#[test]
fn non_fixable_diagnostics_are_reported_and_left_untouched() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let mut item = Item::new("001-foo", "Foo", "cli");
    item.depends_on = vec!["999-missing".to_string()];
    store.write_item(&item).unwrap();

    let diagnostics = run_diagnostics(&store);
    let dangling = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::DanglingDependency)
        .expect("dangling dependency should be flagged");
    assert!(!dangling.fixable);

    let mut backups = BackupSession::open(dir.path(), "heal-002").unwrap();
    let outcomes = apply_fixes(&store, &mut backups, &diagnostics);
    // apply_fixes only attempts fixable diagnostics, so the dangling
    // reference produces no outcome at all rather than a failed attempt.
    assert!(outcomes.iter().all(|o| o.diagnostic_code != "DanglingDependency"));
    assert!(backups.manifest().entries.is_empty());

    let reloaded = store.read_item("001-foo").unwrap();
    assert_eq!(reloaded.depends_on, vec!["999-missing".to_string()]);
}
