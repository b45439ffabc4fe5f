use std::path::Path;

use crate::error::Result;

/// Outcome of merging a revision into the current branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merge (or fast-forward) completed.
    Merged,
    /// The merge stopped with conflicts; the worktree is left conflicted.
    Conflict { paths: Vec<String> },
}

/// Repository operations needed to import upstream sources.
///
/// Commit ids are full hex object names. Implementations are not expected to
/// be called concurrently.
pub trait Repository {
    /// Directory the repository operates in: the worktree root, or the git
    /// directory of a bare repository.
    fn path(&self) -> &Path;

    fn is_bare(&self) -> bool;

    /// True when the repository has no commits at all.
    fn is_empty(&self) -> Result<bool>;

    /// Name of the checked-out branch; `None` when HEAD is unborn or detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// `(clean, description)` where the description lists what is dirty.
    fn is_clean(&self) -> Result<(bool, String)>;

    fn has_branch(&self, name: &str) -> Result<bool>;

    /// Create branch `name` at `revision` without checking it out.
    fn create_branch(&self, name: &str, revision: &str) -> Result<()>;

    /// Check out an existing branch.
    fn set_current_branch(&self, name: &str) -> Result<()>;

    /// Check out `revision`; `hard` discards local modifications.
    fn force_checkout(&self, revision: &str, hard: bool) -> Result<()>;

    /// Record the contents of `tree` as a new commit on `branch`.
    ///
    /// The commit's first parent is the branch tip (none if the branch is
    /// new), followed by `extra_parents`. A missing branch is an error unless
    /// `create_missing_branch` is set.
    fn commit_tree(
        &self,
        tree: &Path,
        message: &str,
        branch: &str,
        extra_parents: &[String],
        create_missing_branch: bool,
    ) -> Result<String>;

    /// Create an annotated (optionally signed) tag on `commit`.
    ///
    /// Succeeds without changes when the tag already points at `commit`.
    fn create_tag(
        &self,
        name: &str,
        message: &str,
        commit: &str,
        sign: bool,
        keyid: Option<&str>,
    ) -> Result<()>;

    /// Merge `revision` into the current branch.
    fn merge(&self, revision: &str) -> Result<MergeOutcome>;

    /// Resolve `revision` to a commit id, `None` if it does not exist.
    fn resolve_revision(&self, revision: &str) -> Result<Option<String>>;

    /// Contents of `path` as of `revision`, `None` if either is missing.
    fn read_file_at(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Whether original archives can be preserved for exact regeneration.
    fn has_archive_preserve(&self) -> bool;

    /// Record `archive`'s bytes against `branch` for later regeneration.
    fn archive_preserve(&self, archive: &Path, branch: &str) -> Result<()>;
}
