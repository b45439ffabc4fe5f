use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use gix::ObjectId;
use tracing::{debug, info};

use crate::error::{RepoError, Result};
use crate::ops::{self, gix_err};
use crate::repository::{MergeOutcome, Repository};

/// Fallback identity when git has no `user.name`/`user.email` configured.
const FALLBACK_NAME: &str = "debsrc";
const FALLBACK_EMAIL: &str = "debsrc@localhost";

/// Tool used to preserve original tarballs next to the upstream branch.
pub const PRISTINE_TAR: &str = "pristine-tar";

/// [`Repository`] backed by gix for object and ref writes and by the `git`
/// executable for worktree operations (checkout, merge, signed tags).
#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
    bare: bool,
}

impl GitRepository {
    /// Open the repository containing `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let bare = match git_stdout(dir, &["rev-parse", "--is-bare-repository"]) {
            Ok(out) => out == "true",
            Err(_) => return Err(RepoError::NotARepo(dir.to_path_buf())),
        };
        let root = if bare {
            git_stdout(dir, &["rev-parse", "--absolute-git-dir"])?
        } else {
            git_stdout(dir, &["rev-parse", "--show-toplevel"])?
        };
        let path = PathBuf::from(root);
        ops::open_repo(&path)?;
        debug!(path = %path.display(), bare, "Opened repository");
        Ok(Self { path, bare })
    }

    /// Value of a git config key, if set.
    pub fn config_value(&self, key: &str) -> Option<String> {
        git_stdout(&self.path, &["config", "--get", key])
            .ok()
            .filter(|value| !value.is_empty())
    }

    /// The primary branch: the one HEAD names (even when unborn), else
    /// `init.defaultBranch`, else `master`.
    pub fn default_branch_name(&self) -> String {
        git_stdout(&self.path, &["symbolic-ref", "-q", "--short", "HEAD"])
            .ok()
            .filter(|name| !name.is_empty())
            .or_else(|| self.config_value("init.defaultBranch"))
            .unwrap_or_else(|| "master".to_string())
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        git_stdout(&self.path, args)
    }

    fn git_output(&self, args: &[&str]) -> Result<Output> {
        Ok(git_command(&self.path, args).output()?)
    }

    fn signature(&self) -> gix::actor::Signature {
        let name = self
            .config_value("user.name")
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let email = self
            .config_value("user.email")
            .unwrap_or_else(|| FALLBACK_EMAIL.to_string());
        ops::make_signature(&name, &email)
    }

    fn to_object_id(&self, revision: &str) -> Result<ObjectId> {
        let hex = self
            .resolve_revision(revision)?
            .ok_or_else(|| RepoError::RevisionNotFound(revision.to_string()))?;
        ObjectId::from_hex(hex.as_bytes()).map_err(gix_err)
    }
}

fn git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    cmd
}

fn git_stdout(dir: &Path, args: &[&str]) -> Result<String> {
    let output = git_command(dir, args).output()?;
    if !output.status.success() {
        return Err(RepoError::Command {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

impl Repository for GitRepository {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_bare(&self) -> bool {
        self.bare
    }

    fn is_empty(&self) -> Result<bool> {
        if self.resolve_revision("HEAD")?.is_some() {
            return Ok(false);
        }
        let heads = self.git(&["for-each-ref", "--count=1", "--format=%(refname)", "refs/heads"])?;
        Ok(heads.is_empty())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        if self.resolve_revision("HEAD")?.is_none() {
            return Ok(None);
        }
        let output = self.git_output(&["symbolic-ref", "-q", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    fn is_clean(&self) -> Result<(bool, String)> {
        if self.bare {
            return Ok((true, String::new()));
        }
        let status = self.git(&["status", "--porcelain"])?;
        Ok((status.is_empty(), status))
    }

    fn has_branch(&self, name: &str) -> Result<bool> {
        let repo = ops::open_repo(&self.path)?;
        Ok(ops::find_ref_tip(&repo, &format!("refs/heads/{name}"))?.is_some())
    }

    fn create_branch(&self, name: &str, revision: &str) -> Result<()> {
        let target = self.to_object_id(revision)?;
        let repo = ops::open_repo(&self.path)?;
        ops::create_ref(
            &repo,
            &format!("refs/heads/{name}"),
            target,
            &format!("branch: Created from {revision}"),
        )?;
        info!(branch = name, commit = %target, "Created branch");
        Ok(())
    }

    fn set_current_branch(&self, name: &str) -> Result<()> {
        self.git(&["checkout", "-q", name])?;
        Ok(())
    }

    fn force_checkout(&self, revision: &str, hard: bool) -> Result<()> {
        let mut args = vec!["checkout", "-q"];
        if hard {
            args.push("-f");
        }
        args.push(revision);
        self.git(&args)?;
        Ok(())
    }

    fn commit_tree(
        &self,
        tree: &Path,
        message: &str,
        branch: &str,
        extra_parents: &[String],
        create_missing_branch: bool,
    ) -> Result<String> {
        let repo = ops::open_repo(&self.path)?;
        let ref_name = format!("refs/heads/{branch}");
        let tip = ops::find_ref_tip(&repo, &ref_name)?.map(|id| id.detach());
        if tip.is_none() && !create_missing_branch {
            return Err(RepoError::BranchNotFound(branch.to_string()));
        }

        let mut parents: Vec<ObjectId> = tip.into_iter().collect();
        for revision in extra_parents {
            let id = self.to_object_id(revision)?;
            if !parents.contains(&id) {
                parents.push(id);
            }
        }

        let tree_id = ops::write_dir_tree(&repo, tree)?;
        let message = if message.ends_with('\n') {
            message.to_string()
        } else {
            format!("{message}\n")
        };
        let commit = ops::create_commit(
            &repo,
            &ref_name,
            tree_id,
            &parents,
            tip,
            self.signature(),
            &message,
        )?;
        info!(branch, commit = %commit, parents = parents.len(), "Committed tree");

        // The ref moved underneath a checked-out branch; bring index and worktree along.
        if !self.bare && self.current_branch()?.as_deref() == Some(branch) {
            self.git(&["reset", "-q", "--hard"])?;
        }
        Ok(commit.to_string())
    }

    fn create_tag(
        &self,
        name: &str,
        message: &str,
        commit: &str,
        sign: bool,
        keyid: Option<&str>,
    ) -> Result<()> {
        if let Some(existing) = self.resolve_revision(&format!("refs/tags/{name}"))? {
            if existing == commit {
                debug!(tag = name, commit, "Tag already in place");
                return Ok(());
            }
            return Err(RepoError::TagExists {
                name: name.to_string(),
                existing,
            });
        }

        let mut args = vec!["tag"];
        match (sign, keyid) {
            (true, Some(key)) => args.extend(["-u", key]),
            (true, None) => args.push("-s"),
            (false, _) => args.push("-a"),
        }
        args.extend(["-m", message, name, commit]);
        self.git(&args)?;
        info!(tag = name, commit, signed = sign, "Created tag");
        Ok(())
    }

    fn merge(&self, revision: &str) -> Result<MergeOutcome> {
        let output = self.git_output(&["merge", "--no-edit", "-q", revision])?;
        if output.status.success() {
            return Ok(MergeOutcome::Merged);
        }

        let unmerged = self.git(&["diff", "--name-only", "--diff-filter=U"])?;
        if unmerged.is_empty() {
            return Err(RepoError::Command {
                command: format!("git merge {revision}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(MergeOutcome::Conflict {
            paths: unmerged.lines().map(str::to_string).collect(),
        })
    }

    fn resolve_revision(&self, revision: &str) -> Result<Option<String>> {
        let spec = format!("{revision}^{{commit}}");
        let output = self.git_output(&["rev-parse", "--verify", "-q", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if id.is_empty() { None } else { Some(id) })
    }

    fn read_file_at(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let spec = format!("{revision}:{path}");
        let output = self.git_output(&["cat-file", "blob", &spec])?;
        Ok(output.status.success().then_some(output.stdout))
    }

    fn has_archive_preserve(&self) -> bool {
        find_on_path(PRISTINE_TAR).is_some()
    }

    fn archive_preserve(&self, archive: &Path, branch: &str) -> Result<()> {
        let output = Command::new(PRISTINE_TAR)
            .arg("commit")
            .arg(archive)
            .arg(branch)
            .current_dir(&self.path)
            .output()?;
        if !output.status.success() {
            return Err(RepoError::Command {
                command: format!("{PRISTINE_TAR} commit {} {branch}", archive.display()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!(archive = %archive.display(), branch, "Preserved original archive");
        Ok(())
    }
}
