//! In-memory doubles for exercising the import flow without git.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use debsrc_git_native::{MergeOutcome, RepoError, Repository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCommit {
    pub id: String,
    pub branch: String,
    pub parents: Vec<String>,
    pub message: String,
    /// Paths of the committed tree, relative and sorted.
    pub files: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    branches: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
    commits: Vec<FakeCommit>,
    /// Checked-out branch, possibly unborn.
    current: Option<String>,
    detached: Option<String>,
    dirty: Option<String>,
    files: BTreeMap<(String, String), Vec<u8>>,
    conflicts: BTreeMap<String, Vec<String>>,
    failing_branches: Vec<String>,
    merges: Vec<(String, String)>,
    preserved: Vec<(PathBuf, String)>,
    checkouts: Vec<String>,
}

/// Repository kept entirely in memory.
///
/// Starts empty with `main` checked out (unborn). Trees handed to
/// `commit_tree` are read from disk so tests can assert on their contents.
#[derive(Debug)]
pub struct FakeRepository {
    path: PathBuf,
    bare: bool,
    preserve_available: bool,
    state: RefCell<FakeState>,
}

impl FakeRepository {
    pub fn new(path: &Path) -> Self {
        let state = FakeState {
            current: Some("main".into()),
            ..Default::default()
        };
        Self {
            path: path.to_path_buf(),
            bare: false,
            preserve_available: true,
            state: RefCell::new(state),
        }
    }

    pub fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    pub fn without_archive_preserve(mut self) -> Self {
        self.preserve_available = false;
        self
    }

    /// Add a commit on `branch` (creating it) without touching the checkout.
    pub fn seed_commit(&self, branch: &str) -> String {
        let mut state = self.state.borrow_mut();
        let parents = state.branches.get(branch).cloned().into_iter().collect();
        let id = push_commit(&mut state, branch, parents, "seed", Vec::new());
        state.branches.insert(branch.to_string(), id.clone());
        id
    }

    pub fn seed_tag(&self, name: &str, commit: &str) {
        self.state
            .borrow_mut()
            .tags
            .insert(name.to_string(), commit.to_string());
    }

    /// Make `path` readable at the tip of `branch`.
    pub fn add_file(&self, branch: &str, path: &str, content: &[u8]) {
        self.state
            .borrow_mut()
            .files
            .insert((branch.to_string(), path.to_string()), content.to_vec());
    }

    pub fn checkout(&self, branch: &str) {
        let mut state = self.state.borrow_mut();
        state.current = Some(branch.to_string());
        state.detached = None;
    }

    pub fn set_dirty(&self, status: &str) {
        self.state.borrow_mut().dirty = Some(status.to_string());
    }

    pub fn conflict_on_merge_into(&self, branch: &str, paths: &[&str]) {
        self.state.borrow_mut().conflicts.insert(
            branch.to_string(),
            paths.iter().map(|p| p.to_string()).collect(),
        );
    }

    pub fn fail_commits_on(&self, branch: &str) {
        self.state
            .borrow_mut()
            .failing_branches
            .push(branch.to_string());
    }

    pub fn branch_tip(&self, branch: &str) -> Option<String> {
        self.state.borrow().branches.get(branch).cloned()
    }

    pub fn branches(&self) -> Vec<String> {
        self.state.borrow().branches.keys().cloned().collect()
    }

    pub fn tag_target(&self, tag: &str) -> Option<String> {
        self.state.borrow().tags.get(tag).cloned()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.keys().cloned().collect()
    }

    pub fn commit(&self, id: &str) -> Option<FakeCommit> {
        self.state
            .borrow()
            .commits
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn commits(&self) -> Vec<FakeCommit> {
        self.state.borrow().commits.clone()
    }

    pub fn checked_out(&self) -> Option<String> {
        self.state.borrow().current.clone()
    }

    /// `(branch, revision)` for every merge performed.
    pub fn merges(&self) -> Vec<(String, String)> {
        self.state.borrow().merges.clone()
    }

    pub fn preserved(&self) -> Vec<(PathBuf, String)> {
        self.state.borrow().preserved.clone()
    }

    /// Every revision passed to `force_checkout`, in order.
    pub fn checkouts(&self) -> Vec<String> {
        self.state.borrow().checkouts.clone()
    }

    fn resolve(state: &FakeState, revision: &str) -> Option<String> {
        let revision = revision
            .strip_suffix("^{commit}")
            .or_else(|| revision.strip_suffix("^{}"))
            .unwrap_or(revision);
        if revision == "HEAD" {
            return match &state.current {
                Some(branch) => state.branches.get(branch).cloned(),
                None => state.detached.clone(),
            };
        }
        state
            .branches
            .get(revision)
            .or_else(|| state.tags.get(revision))
            .cloned()
            .or_else(|| {
                state
                    .commits
                    .iter()
                    .find(|c| c.id == revision)
                    .map(|c| c.id.clone())
            })
    }
}

fn push_commit(
    state: &mut FakeState,
    branch: &str,
    parents: Vec<String>,
    message: &str,
    files: Vec<String>,
) -> String {
    let id = format!("{:040x}", state.commits.len() + 1);
    state.commits.push(FakeCommit {
        id: id.clone(),
        branch: branch.to_string(),
        parents,
        message: message.to_string(),
        files,
    });
    id
}

fn list_files(root: &Path) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                files.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    files.sort();
    Ok(files)
}

impl Repository for FakeRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_bare(&self) -> bool {
        self.bare
    }

    fn is_empty(&self) -> debsrc_git_native::Result<bool> {
        Ok(self.state.borrow().commits.is_empty())
    }

    fn current_branch(&self) -> debsrc_git_native::Result<Option<String>> {
        let state = self.state.borrow();
        Ok(state
            .current
            .clone()
            .filter(|branch| state.branches.contains_key(branch)))
    }

    fn is_clean(&self) -> debsrc_git_native::Result<(bool, String)> {
        Ok(match &self.state.borrow().dirty {
            Some(status) => (false, status.clone()),
            None => (true, String::new()),
        })
    }

    fn has_branch(&self, name: &str) -> debsrc_git_native::Result<bool> {
        Ok(self.state.borrow().branches.contains_key(name))
    }

    fn create_branch(&self, name: &str, revision: &str) -> debsrc_git_native::Result<()> {
        let mut state = self.state.borrow_mut();
        let target = Self::resolve(&state, revision)
            .ok_or_else(|| RepoError::RevisionNotFound(revision.to_string()))?;
        state.branches.insert(name.to_string(), target);
        Ok(())
    }

    fn set_current_branch(&self, name: &str) -> debsrc_git_native::Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.branches.contains_key(name) {
            return Err(RepoError::BranchNotFound(name.to_string()));
        }
        state.current = Some(name.to_string());
        state.detached = None;
        Ok(())
    }

    fn force_checkout(&self, revision: &str, _hard: bool) -> debsrc_git_native::Result<()> {
        let mut state = self.state.borrow_mut();
        state.checkouts.push(revision.to_string());
        if state.branches.contains_key(revision) {
            state.current = Some(revision.to_string());
            state.detached = None;
            return Ok(());
        }
        let commit = Self::resolve(&state, revision)
            .ok_or_else(|| RepoError::RevisionNotFound(revision.to_string()))?;
        state.current = None;
        state.detached = Some(commit);
        Ok(())
    }

    fn commit_tree(
        &self,
        tree: &Path,
        message: &str,
        branch: &str,
        extra_parents: &[String],
        create_missing_branch: bool,
    ) -> debsrc_git_native::Result<String> {
        let files = list_files(tree).map_err(|e| RepoError::InvalidTree {
            path: tree.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut state = self.state.borrow_mut();
        if state.failing_branches.iter().any(|b| b == branch) {
            return Err(RepoError::Command {
                command: format!("commit to {branch}"),
                stderr: "simulated failure".into(),
            });
        }
        let tip = state.branches.get(branch).cloned();
        if tip.is_none() && !create_missing_branch {
            return Err(RepoError::BranchNotFound(branch.to_string()));
        }
        let mut parents: Vec<String> = tip.into_iter().collect();
        for parent in extra_parents {
            if !parents.contains(parent) {
                parents.push(parent.clone());
            }
        }
        let id = push_commit(&mut state, branch, parents, message, files);
        state.branches.insert(branch.to_string(), id.clone());
        Ok(id)
    }

    fn create_tag(
        &self,
        name: &str,
        _message: &str,
        commit: &str,
        _sign: bool,
        _keyid: Option<&str>,
    ) -> debsrc_git_native::Result<()> {
        let mut state = self.state.borrow_mut();
        match state.tags.get(name) {
            Some(existing) if existing == commit => Ok(()),
            Some(existing) => Err(RepoError::TagExists {
                name: name.to_string(),
                existing: existing.clone(),
            }),
            None => {
                state.tags.insert(name.to_string(), commit.to_string());
                Ok(())
            }
        }
    }

    fn merge(&self, revision: &str) -> debsrc_git_native::Result<MergeOutcome> {
        let mut state = self.state.borrow_mut();
        let branch = state
            .current
            .clone()
            .ok_or_else(|| RepoError::BranchNotFound("HEAD".into()))?;
        let theirs = Self::resolve(&state, revision)
            .ok_or_else(|| RepoError::RevisionNotFound(revision.to_string()))?;
        state.merges.push((branch.clone(), revision.to_string()));
        if let Some(paths) = state.conflicts.get(&branch).cloned() {
            return Ok(MergeOutcome::Conflict { paths });
        }
        let parents = state
            .branches
            .get(&branch)
            .cloned()
            .into_iter()
            .chain([theirs])
            .collect();
        let message = format!("Merge {revision} into {branch}");
        let id = push_commit(&mut state, &branch, parents, &message, Vec::new());
        state.branches.insert(branch, id);
        Ok(MergeOutcome::Merged)
    }

    fn resolve_revision(&self, revision: &str) -> debsrc_git_native::Result<Option<String>> {
        Ok(Self::resolve(&self.state.borrow(), revision))
    }

    fn read_file_at(&self, revision: &str, path: &str) -> debsrc_git_native::Result<Option<Vec<u8>>> {
        Ok(self
            .state
            .borrow()
            .files
            .get(&(revision.to_string(), path.to_string()))
            .cloned())
    }

    fn has_archive_preserve(&self) -> bool {
        self.preserve_available
    }

    fn archive_preserve(&self, archive: &Path, branch: &str) -> debsrc_git_native::Result<()> {
        self.state
            .borrow_mut()
            .preserved
            .push((archive.to_path_buf(), branch.to_string()));
        Ok(())
    }
}

/// Prompter answering from a fixed script.
///
/// An empty answer selects the default. Invalid answers are consumed and
/// the next one is tried, like a user retyping.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Questions asked so far, one entry per `ask` call.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl crate::identity::Prompter for ScriptedPrompter {
    fn ask(
        &self,
        question: &str,
        default: Option<&str>,
        validate: &dyn Fn(&str) -> bool,
        _invalid_msg: &str,
    ) -> io::Result<String> {
        self.asked.borrow_mut().push(question.to_string());
        loop {
            let answer = self
                .answers
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))?;
            let answer = match (answer.is_empty(), default) {
                (true, Some(default)) => default.to_string(),
                _ => answer,
            };
            if validate(&answer) {
                return Ok(answer);
            }
        }
    }
}

/// Write a gzip tarball at `path` holding `entries` as `(path, contents)`.
pub fn write_tarball(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}
