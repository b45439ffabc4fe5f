//! The import-orig run: detect, unpack, import, merge, clean up.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use debsrc_core::{component_branch, ArchiveFormat};
use debsrc_git_native::Repository;
use debsrc_runtime_config::ImportOrigConfig;
use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::commit::commit_upstream;
use crate::error::{ImportOrigError, Result};
use crate::hook::run_postimport;
use crate::identity::{IdentityResolver, Prompter};
use crate::integrate::integrate;
use crate::link::{canonical_orig_name, link_to_canonical};
use crate::normalize::Normalizer;
use crate::session::{ImportOrigOutcome, ImportSession, ImportedComponent};
use crate::unpack::FilterSet;

const FALLBACK_DEFAULT_BRANCH: &str = "master";

/// What to import.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub artifacts: Vec<PathBuf>,
    /// Upstream version overriding detection.
    pub version: Option<String>,
    /// Upstream VCS tag recorded as an additional parent of the import.
    pub upstream_vcs_tag: Option<String>,
}

#[derive(Debug, Clone)]
struct InitialHead {
    branch: Option<String>,
    commit: String,
}

#[derive(Debug, Default)]
struct RunState {
    initial: Option<InitialHead>,
    /// Leave the worktree as is: a merge stopped with conflicts.
    keep_worktree: bool,
}

pub struct Importer<'a, R: Repository + ?Sized> {
    repo: &'a R,
    config: ImportOrigConfig,
    prompter: &'a dyn Prompter,
    default_branch: String,
}

impl<'a, R: Repository + ?Sized> Importer<'a, R> {
    pub fn new(repo: &'a R, config: ImportOrigConfig, prompter: &'a dyn Prompter) -> Self {
        let default_branch = config
            .default_branch
            .clone()
            .unwrap_or_else(|| FALLBACK_DEFAULT_BRANCH.to_string());
        Self {
            repo,
            config,
            prompter,
            default_branch,
        }
    }

    /// Primary branch populated alongside the packaging branch when the
    /// repository starts out empty.
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Import every artifact of `request`.
    ///
    /// Temporary trees and owned archive links are removed whether or not the
    /// run succeeds. The worktree returns to the branch it started on unless
    /// the repository was empty or a merge stopped with conflicts.
    pub fn run(&self, request: &ImportRequest) -> Result<ImportOrigOutcome> {
        let mut config = self.config.clone();
        let mut sessions = Vec::new();
        let mut state = RunState::default();

        let result = self.run_phases(request, &mut config, &mut sessions, &mut state);
        if let Err(e) = &result {
            state.keep_worktree = matches!(e, ImportOrigError::MergeConflict { .. });
            debug!("Import failed: {e}");
        }
        self.finish(&config, &mut sessions, &state);
        result
    }

    fn run_phases(
        &self,
        request: &ImportRequest,
        config: &mut ImportOrigConfig,
        sessions: &mut Vec<ImportSession>,
        state: &mut RunState,
    ) -> Result<ImportOrigOutcome> {
        let empty = self.check_preconditions(config, state)?;
        let filters =
            FilterSet::new(&config.filters).map_err(|e| ImportOrigError::InvalidFilter(e.to_string()))?;

        self.detect(request, config, sessions)?;

        let work_dir = self.work_dir();
        let normalizer = Normalizer::new(&work_dir, &filters)
            .preserving(config.pristine_tar, config.filters_preserved_archive());
        for session in sessions.iter_mut() {
            normalizer.normalize(session)?;
        }

        let vcs_parent = self.resolve_vcs_parent(request, sessions)?;
        for session in sessions.iter_mut() {
            self.link_archive(session, &work_dir);
            commit_upstream(self.repo, session, config, vcs_parent.as_deref())?;
        }

        let mut merged_into = Vec::new();
        let mut postimport_ran = false;
        if config.merge {
            self.merge_all(sessions, &config.debian_branch)?;
            merged_into.push(config.debian_branch.clone());
        }

        // A new repository always gets its primary branch, merge or not.
        if empty && !self.repo.is_bare() && config.debian_branch != self.default_branch {
            self.merge_all(sessions, &self.default_branch)?;
            merged_into.push(self.default_branch.clone());
            if config.merge {
                self.repo.set_current_branch(&config.debian_branch)?;
            }
        }

        if config.merge {
            if let Some(template) = &config.postimport {
                self.repo.set_current_branch(&config.debian_branch)?;
                run_postimport(
                    self.repo.path(),
                    template,
                    &config.debian_branch,
                    &sessions[0].version,
                )?;
                postimport_ran = true;
            }
        }

        let imported = sessions
            .iter()
            .filter_map(|s| {
                Some(ImportedComponent {
                    component: s.component.clone(),
                    branch: s.upstream_branch.clone(),
                    commit: s.commit.clone()?,
                    tag: s.tag.clone()?,
                })
            })
            .collect();
        Ok(ImportOrigOutcome {
            name: sessions[0].name.clone(),
            version: sessions[0].version.clone(),
            imported,
            merged_into,
            postimport_ran,
        })
    }

    /// Returns whether the repository is empty.
    fn check_preconditions(&self, config: &mut ImportOrigConfig, state: &mut RunState) -> Result<bool> {
        let empty = self.repo.is_empty()?;
        if !empty {
            if let Some(commit) = self.repo.resolve_revision("HEAD")? {
                state.initial = Some(InitialHead {
                    branch: self.repo.current_branch()?,
                    commit,
                });
            }
        }

        if self.repo.is_bare() {
            if config.merge || config.pristine_tar {
                info!("Bare repository: disabling merge and pristine-tar");
            }
            config.merge = false;
            config.pristine_tar = false;
        } else if !empty {
            let (clean, status) = self.repo.is_clean()?;
            if !clean {
                return Err(ImportOrigError::UncommittedChanges(status));
            }
        }

        if config.pristine_tar && !self.repo.has_archive_preserve() {
            warn!("pristine-tar is not available, not preserving archives");
            config.pristine_tar = false;
        }

        if !empty && !self.repo.has_branch(&config.upstream_branch)? {
            return Err(ImportOrigError::MissingUpstreamBranch(
                config.upstream_branch.clone(),
            ));
        }
        Ok(empty)
    }

    /// Resolve every artifact's identity and branch before touching disk.
    fn detect(
        &self,
        request: &ImportRequest,
        config: &ImportOrigConfig,
        sessions: &mut Vec<ImportSession>,
    ) -> Result<()> {
        if request.artifacts.is_empty() {
            return Err(ImportOrigError::NoArtifacts);
        }
        let resolver =
            IdentityResolver::new(self.repo, self.prompter, &config.debian_branch, config.interactive)
                .with_version(request.version.as_deref());

        let mut branches = BTreeSet::new();
        for path in &request.artifacts {
            let artifact = Artifact::new(path);
            let identity = resolver.resolve(&artifact)?;
            let branch = component_branch(&config.upstream_branch, &identity.component);
            if !branches.insert(branch.clone()) {
                return Err(ImportOrigError::DuplicateComponent {
                    component: identity.component,
                    branch,
                });
            }
            sessions.push(ImportSession::new(artifact, identity, branch));
        }

        let first = &sessions[0];
        if let Some(other) = sessions
            .iter()
            .find(|s| s.name != first.name || s.version != first.version)
        {
            return Err(ImportOrigError::Identity(format!(
                "'{}' is {} {} but '{}' is {} {}",
                first.artifact.original_path.display(),
                first.name,
                first.version,
                other.artifact.original_path.display(),
                other.name,
                other.version
            )));
        }
        Ok(())
    }

    fn resolve_vcs_parent(
        &self,
        request: &ImportRequest,
        sessions: &[ImportSession],
    ) -> Result<Option<String>> {
        let Some(tag) = &request.upstream_vcs_tag else {
            return Ok(None);
        };
        let commit = self
            .repo
            .resolve_revision(&format!("{tag}^{{commit}}"))?
            .ok_or_else(|| {
                ImportOrigError::import(
                    &sessions[0].artifact.original_path,
                    format!("upstream VCS tag '{tag}' not found"),
                )
            })?;
        Ok(Some(commit))
    }

    /// Give tarballs their canonical orig name. Failure only costs archive
    /// preservation.
    fn link_archive(&self, session: &mut ImportSession, dir: &Path) {
        if session.artifact.archive_format() != Some(ArchiveFormat::Tar) {
            return;
        }
        let canonical = canonical_orig_name(
            &session.artifact.path,
            &session.name,
            &session.version,
            &session.component,
        );
        match link_to_canonical(&session.artifact.path, dir, &canonical) {
            Ok(link) => session.archive_link = Some(link),
            Err(e) => warn!("{e}"),
        }
    }

    fn merge_all(&self, sessions: &[ImportSession], branch: &str) -> Result<()> {
        for session in sessions {
            integrate(self.repo, session, branch)?;
        }
        Ok(())
    }

    fn work_dir(&self) -> PathBuf {
        self.repo
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir)
    }

    fn finish(&self, config: &ImportOrigConfig, sessions: &mut [ImportSession], state: &RunState) {
        for session in sessions.iter_mut() {
            session.cleanup(config.symlink_orig);
        }
        if self.repo.is_bare() || state.keep_worktree {
            return;
        }
        if let Some(initial) = &state.initial {
            self.restore(initial);
        }
    }

    fn restore(&self, initial: &InitialHead) {
        let branch = self.repo.current_branch().ok().flatten();
        let commit = self.repo.resolve_revision("HEAD").ok().flatten();
        if branch == initial.branch && commit.as_deref() == Some(initial.commit.as_str()) {
            return;
        }
        let target = initial.branch.as_deref().unwrap_or(&initial.commit);
        if branch.as_deref() != Some(target) {
            info!("Switching back to '{}'", target);
        }
        if let Err(e) = self.repo.force_checkout(target, true) {
            warn!("Failed to restore '{}': {e}", target);
        }
    }
}
