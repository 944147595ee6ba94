//! Shared test doubles for integration tests that need a `GitOperations`
//! implementation without a real git repository on disk.

use std::collections::HashSet;

use anyhow::Result;
use wreckit::git::operations::DirectMergeResult;
use wreckit::git::GitOperations;

/// Reports a perpetually clean, unchanged working tree. Sufficient for the
/// Workflow Engine's write-root enforcement, which is all these tests
/// exercise — no test here drives a real branch/commit/push workflow.
pub struct NoopGit;

impl GitOperations for NoopGit {
    fn current_branch(&self) -> Result<String> {
        Ok("main".to_string())
    }
    fn working_tree_clean(&self) -> Result<bool> {
        Ok(true)
    }
    fn head_sha(&self) -> Result<String> {
        Ok("0".repeat(40))
    }
    fn ensure_branch(&self, _name: &str, _base: &str) -> Result<()> {
        Ok(())
    }
    fn create_branch_from(&self, _name: &str, _base: &str) -> Result<()> {
        Ok(())
    }
    fn snapshot_status(&self) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
    fn diff_status(&self, _before: &HashSet<String>) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
    fn commit_all(&self, _message: &str) -> Result<Option<String>> {
        Ok(None)
    }
    fn checkout_branch(&self, _branch: &str) -> Result<()> {
        Ok(())
    }
    fn create_branch(&self, _name: &str, _from: &str) -> Result<()> {
        Ok(())
    }
    fn direct_merge(&self, _base_branch: &str, _item_branch: &str) -> Result<DirectMergeResult> {
        Ok(DirectMergeResult {
            rollback_sha: "0".repeat(40),
            merge_commit_sha: "1".repeat(40),
        })
    }
}
