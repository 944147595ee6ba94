use anyhow::{Context, Result};
use git2::{BranchType, Oid, Repository, Signature};
use std::collections::HashSet;
use std::path::Path;

/// Trait defining core git operations used by the workflow engine and
/// orchestrator (spec §4.2, C2 "Git Integration"). Every method is an
/// idempotent primitive: callers compose them into branch/PR workflows.
pub trait GitOperations {
    /// Name of the branch HEAD currently points to.
    fn current_branch(&self) -> Result<String>;

    /// True iff the working tree has no staged or unstaged changes.
    fn working_tree_clean(&self) -> Result<bool>;

    /// The sha HEAD currently resolves to.
    fn head_sha(&self) -> Result<String>;

    /// Switch to `name` if it exists locally, else create it from `base` and
    /// switch. Idempotent: calling twice with the same args is a no-op on
    /// the second call once already on `name`.
    fn ensure_branch(&self, name: &str, base: &str) -> Result<()>;

    /// Create `name` from `base`; fails if `name` already exists.
    fn create_branch_from(&self, name: &str, base: &str) -> Result<()>;

    /// Capture the set of paths currently showing a working-tree or index
    /// status change, for later comparison via `diff_status`.
    fn snapshot_status(&self) -> Result<HashSet<String>>;

    /// Paths whose status changed between `before` and now.
    fn diff_status(&self, before: &HashSet<String>) -> Result<HashSet<String>>;

    /// Stage all tracked changes and commit with `message`. No-op (returns
    /// `Ok(None)`) if the working tree is already clean; otherwise returns
    /// the new commit sha.
    fn commit_all(&self, message: &str) -> Result<Option<String>>;

    /// Checkout a branch (replaces `git checkout`)
    fn checkout_branch(&self, branch: &str) -> Result<()>;

    /// Create a new branch (replaces `git branch -b`)
    fn create_branch(&self, name: &str, from: &str) -> Result<()>;

    /// Direct-merge mode: fast-forward/merge `item_branch` into `base_branch`
    /// and return the pre-merge base HEAD sha, to be recorded as the item's
    /// `rollback_sha` (spec §4.2, §9 — no automatic rollback is implemented,
    /// the sha is recorded for manual use only).
    fn direct_merge(&self, base_branch: &str, item_branch: &str) -> Result<DirectMergeResult>;
}

#[derive(Debug, Clone)]
pub struct DirectMergeResult {
    pub rollback_sha: String,
    pub merge_commit_sha: String,
}

/// Implementation of GitOperations using git2
pub struct Git2Operations {
    repo: Repository,
}

impl Git2Operations {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    fn get_signature(&self) -> Result<Signature> {
        // Try to get signature from config, fall back to defaults
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Signature::now("Wreckit Agent", "noreply@wreckit.dev")
                .context("Failed to create default signature"),
        }
    }

    fn status_paths(&self) -> Result<HashSet<String>> {
        let statuses = self.repo.statuses(None)?;
        let mut paths = HashSet::new();
        for entry in statuses.iter() {
            if let Some(path) = entry.path() {
                paths.insert(path.to_string());
            }
        }
        Ok(paths)
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        match self.repo.find_branch(branch, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

impl GitOperations for Git2Operations {
    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to resolve HEAD")?;
        let name = head
            .shorthand()
            .context("HEAD is not a valid UTF-8 branch name")?;
        Ok(name.to_string())
    }

    fn working_tree_clean(&self) -> Result<bool> {
        let statuses = self.repo.statuses(None)?;
        Ok(statuses.is_empty())
    }

    fn head_sha(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to resolve HEAD")?;
        let oid = head.target().context("HEAD has no target commit")?;
        Ok(oid.to_string())
    }

    fn ensure_branch(&self, name: &str, base: &str) -> Result<()> {
        if self.branch_exists(name)? {
            self.checkout_branch(name)
        } else {
            self.create_branch(name, base)?;
            self.checkout_branch(name)
        }
    }

    fn create_branch_from(&self, name: &str, base: &str) -> Result<()> {
        if self.branch_exists(name)? {
            return Err(anyhow::anyhow!("branch '{name}' already exists"));
        }
        self.create_branch(name, base)
    }

    fn snapshot_status(&self) -> Result<HashSet<String>> {
        self.status_paths()
    }

    fn diff_status(&self, before: &HashSet<String>) -> Result<HashSet<String>> {
        let after = self.status_paths()?;
        Ok(after.symmetric_difference(before).cloned().collect())
    }

    fn commit_all(&self, message: &str) -> Result<Option<String>> {
        if self.working_tree_clean()? {
            return Ok(None);
        }

        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.get_signature()?;
        let parent = self.repo.head()?.peel_to_commit()?;

        let commit_id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(Some(commit_id.to_string()))
    }

    fn checkout_branch(&self, branch: &str) -> Result<()> {
        // Find the branch reference
        let branch_ref = self
            .repo
            .find_branch(branch, BranchType::Local)
            .or_else(|_| self.repo.find_branch(branch, BranchType::Remote))
            .with_context(|| format!("Branch '{branch}' not found"))?;

        let reference = branch_ref.get();
        let target = reference.target().context("Branch has no target commit")?;

        // Get the commit and tree
        let commit = self.repo.find_commit(target)?;
        let tree = commit.tree()?;

        // Set HEAD to the branch
        self.repo.set_head(reference.name().unwrap())?;

        // Update working directory
        self.repo.checkout_tree(tree.as_object(), None)?;

        Ok(())
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        // Find the reference commit
        let from_commit = if from == "HEAD" {
            self.repo.head()?.peel_to_commit()?
        } else {
            // Try to find as branch first, then as commit
            if let Ok(branch) = self
                .repo
                .find_branch(from, BranchType::Local)
                .or_else(|_| self.repo.find_branch(from, BranchType::Remote))
            {
                branch.get().peel_to_commit()?
            } else {
                // Try as commit ID
                let oid = Oid::from_str(from)
                    .map_err(|e| anyhow::anyhow!("Invalid commit or branch '{}': {}", from, e))?;
                self.repo.find_commit(oid)?
            }
        };

        // Create the branch
        self.repo
            .branch(name, &from_commit, false)
            .with_context(|| format!("Failed to create branch '{name}'"))?;

        Ok(())
    }

    fn direct_merge(&self, base_branch: &str, item_branch: &str) -> Result<DirectMergeResult> {
        let base_ref = self
            .repo
            .find_branch(base_branch, BranchType::Local)
            .with_context(|| format!("base branch '{base_branch}' not found"))?;
        let rollback_sha = base_ref
            .get()
            .target()
            .context("base branch has no target commit")?
            .to_string();

        self.checkout_branch(base_branch)?;

        let item_commit = self
            .repo
            .find_branch(item_branch, BranchType::Local)
            .with_context(|| format!("item branch '{item_branch}' not found"))?
            .get()
            .peel_to_commit()?;
        let base_commit = self.repo.head()?.peel_to_commit()?;

        let base_tree = base_commit.tree()?;
        let item_tree = item_commit.tree()?;
        let ancestor_oid = self.repo.merge_base(base_commit.id(), item_commit.id())?;
        let ancestor_commit = self.repo.find_commit(ancestor_oid)?;
        let ancestor_tree = ancestor_commit.tree()?;

        let mut index = self
            .repo
            .merge_trees(&ancestor_tree, &base_tree, &item_tree, None)?;
        if index.has_conflicts() {
            return Err(anyhow::anyhow!(
                "merge conflict merging '{item_branch}' into '{base_branch}'"
            ));
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.get_signature()?;
        let message = format!("Merge branch '{item_branch}' into {base_branch}");

        let merge_commit_id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&base_commit, &item_commit],
        )?;

        Ok(DirectMergeResult {
            rollback_sha,
            merge_commit_sha: merge_commit_id.to_string(),
        })
    }
}
