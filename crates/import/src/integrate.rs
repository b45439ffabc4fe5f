//! Bring an imported upstream tag into a packaging branch.

use debsrc_git_native::{MergeOutcome, RepoError, Repository};
use tracing::info;

use crate::error::{ImportOrigError, Result};
use crate::session::ImportSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// The branch did not exist and was created at the upstream commit.
    Bootstrapped,
    Merged,
}

/// Merge the session's upstream tag into `branch`, creating the branch at the
/// upstream commit when it does not exist yet. Either way `branch` ends up
/// checked out.
pub fn integrate<R: Repository + ?Sized>(
    repo: &R,
    session: &ImportSession,
    branch: &str,
) -> Result<Integration> {
    let origin = &session.artifact.original_path;
    let (Some(commit), Some(tag)) = (&session.commit, &session.tag) else {
        return Err(ImportOrigError::import(origin, "nothing was imported to merge"));
    };

    let import_err = |e: RepoError| ImportOrigError::import(origin, e);
    if !repo.has_branch(branch).map_err(import_err)? {
        repo.create_branch(branch, commit).map_err(import_err)?;
        repo.force_checkout(branch, true).map_err(import_err)?;
        info!("Created branch '{}' at '{}'", branch, tag);
        return Ok(Integration::Bootstrapped);
    }

    info!("Merging '{}' to '{}'", tag, branch);
    repo.set_current_branch(branch).map_err(import_err)?;
    match repo.merge(tag).map_err(import_err)? {
        MergeOutcome::Merged => Ok(Integration::Merged),
        MergeOutcome::Conflict { paths } => Err(ImportOrigError::MergeConflict {
            tag: tag.clone(),
            branch: branch.to_string(),
            paths,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::identity::Identity;
    use crate::testing::FakeRepository;

    fn imported_session(repo: &FakeRepository) -> ImportSession {
        let commit = repo.seed_commit("upstream");
        repo.seed_tag("upstream/1.0", &commit);
        let mut session = ImportSession::new(
            Artifact::new("/x/foo-1.0.tar.gz"),
            Identity {
                name: "foo".into(),
                version: "1.0".into(),
                component: String::new(),
            },
            "upstream".into(),
        );
        session.commit = Some(commit);
        session.tag = Some("upstream/1.0".into());
        session
    }

    #[test]
    fn test_missing_branch_is_bootstrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        let session = imported_session(&repo);

        assert_eq!(
            integrate(&repo, &session, "debian").unwrap(),
            Integration::Bootstrapped
        );
        assert_eq!(repo.branch_tip("debian"), session.commit);
        assert_eq!(repo.checked_out().as_deref(), Some("debian"));
    }

    #[test]
    fn test_existing_branch_is_merged() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        repo.seed_commit("debian");
        let session = imported_session(&repo);

        assert_eq!(integrate(&repo, &session, "debian").unwrap(), Integration::Merged);
        assert_eq!(repo.merges(), vec![("debian".to_string(), "upstream/1.0".to_string())]);
        assert_eq!(repo.checked_out().as_deref(), Some("debian"));
    }

    #[test]
    fn test_conflict_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        repo.seed_commit("debian");
        repo.conflict_on_merge_into("debian", &["configure.ac"]);
        let session = imported_session(&repo);

        let err = integrate(&repo, &session, "debian").unwrap_err();
        match err {
            ImportOrigError::MergeConflict { tag, branch, paths } => {
                assert_eq!(tag, "upstream/1.0");
                assert_eq!(branch, "debian");
                assert_eq!(paths, vec!["configure.ac".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(repo.checked_out().as_deref(), Some("debian"));
    }
}
