//! Binary-level smoke tests, grounded on the teacher's own assert_cmd-based
//! CLI tests. These exercise `wreckit` as a subprocess rather than through
//! its library API, catching wiring mistakes unit tests can't see (argument
//! parsing, exit codes, stdout formatting).

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn no_subcommand_prints_the_quick_start_banner() {
    let mut cmd = Command::cargo_bin("wreckit").unwrap();

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wreckit idea"))
        .stdout(predicate::str::contains("wreckit orchestrate"))
        .stdout(predicate::str::contains("wreckit doctor --fix"));
}

#[test]
fn status_on_an_empty_store_tells_the_user_to_file_an_item() {
    let dir = tempfile::tempdir().unwrap();
    git2::Repository::init(dir.path()).unwrap();

    let mut cmd = Command::cargo_bin("wreckit").unwrap();
    cmd.arg("--root").arg(dir.path()).arg("status");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wreckit idea"));
}

#[test]
fn idea_then_status_lists_the_new_item_as_raw() {
    let dir = tempfile::tempdir().unwrap();
    git2::Repository::init(dir.path()).unwrap();

    let mut file_idea = Command::cargo_bin("wreckit").unwrap();
    file_idea
        .arg("--root")
        .arg(dir.path())
        .arg("idea")
        .arg("Add widget support")
        .assert()
        .success()
        .stdout(predicate::str::contains("001-add-widget-support"));

    let mut status = Command::cargo_bin("wreckit").unwrap();
    status.arg("--root").arg(dir.path()).arg("status");

    status
        .assert()
        .success()
        .stdout(predicate::str::contains("001-add-widget-support"))
        .stdout(predicate::str::contains("Raw"));
}
