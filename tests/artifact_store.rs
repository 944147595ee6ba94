//! Integration tests for the filesystem-rooted Artifact Store: atomic
//! writes, index rebuild, and id resolution working together against a
//! real temp directory rather than individual unit-tested pieces.

use tempfile::tempdir;
use wreckit::artifact::item::Item;
use wreckit::artifact::prd::{Prd, StoryStatus, UserStory};
use wreckit::artifact::store::FsArtifactStore;
use wreckit::workflow::state::ItemState;

fn story(id: &str, priority: u8, status: StoryStatus) -> UserStory {
    UserStory {
        id: id.to_string(),
        title: "story".to_string(),
        acceptance_criteria: vec!["works".to_string()],
        priority,
        status,
        notes: String::new(),
        branch_name: "wreckit/001-foo".to_string(),
    }
}

#[test]
fn write_then_scan_then_resolve_round_trips_across_the_store() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    store.write_item(&Item::new("001-foo", "Foo item", "cli")).unwrap();
    store.write_item(&Item::new("002-bar", "Bar item", "cli")).unwrap();

    let scanned = store.scan_items().unwrap();
    assert_eq!(scanned.len(), 2);
    assert_eq!(scanned[0].id, "001-foo");

    assert_eq!(store.resolve_id("1").unwrap(), "001-foo");
    assert_eq!(store.resolve_id("bar").unwrap(), "002-bar");
    assert!(store.resolve_id("999").is_err());
}

#[test]
fn resolve_id_reports_ambiguous_substring_matches() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());
    store.write_item(&Item::new("001-add-foo", "a", "cli")).unwrap();
    store.write_item(&Item::new("002-add-bar", "b", "cli")).unwrap();

    let err = store.resolve_id("add").unwrap_err();
    match err {
        wreckit::error::WreckitError::AmbiguousId { candidates, .. } => {
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected AmbiguousId, got {other:?}"),
    }
}

#[test]
fn rebuild_index_reflects_items_written_directly_to_disk() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());
    store.write_item(&Item::new("001-foo", "Foo", "cli")).unwrap();

    store.rebuild_index().unwrap();

    // Simulate the index going stale: a second item lands on disk without
    // anyone updating the index, then a rebuild catches it up.
    store.write_item(&Item::new("002-bar", "Bar", "cli")).unwrap();
    store.rebuild_index().unwrap();

    let all = store.read_all_items().unwrap();
    assert_eq!(all.iter().map(|i| i.id.clone()).collect::<Vec<_>>(), vec![
        "001-foo".to_string(),
        "002-bar".to_string(),
    ]);
}

#[test]
fn prd_round_trips_with_stories_and_validation_summary() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let mut item = Item::new("001-foo", "Foo", "cli");
    item.state = ItemState::Planned;
    store.write_item(&item).unwrap();

    let mut prd = Prd::new("001-foo");
    prd.user_stories.push(story("US-1", 2, StoryStatus::Done));
    prd.user_stories.push(story("US-2", 1, StoryStatus::Pending));
    store.write_prd(&prd).unwrap();

    let reloaded = store.read_prd("001-foo").unwrap();
    assert!(reloaded.has_stories());
    assert!(reloaded.any_pending());
    assert!(!reloaded.all_done());

    let summary = reloaded.to_validation_summary();
    assert!(summary.any_pending());
}

#[test]
fn append_progress_log_is_append_only_across_calls() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());
    store.write_item(&Item::new("001-foo", "Foo", "cli")).unwrap();

    store.append_progress_log("001-foo", "first entry").unwrap();
    store.append_progress_log("001-foo", "second entry").unwrap();

    let log = std::fs::read_to_string(dir.path().join("items/001-foo/progress.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first entry"));
    assert!(lines[1].ends_with("second entry"));
}
