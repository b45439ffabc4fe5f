//! Record an unpacked tree on its upstream branch and tag it.

use debsrc_core::{expand_version, version_to_tag};
use debsrc_git_native::Repository;
use debsrc_runtime_config::ImportOrigConfig;
use tracing::{info, warn};

use crate::error::{ImportOrigError, Result};
use crate::session::ImportSession;

/// Commit the session's unpacked tree onto its upstream branch, preserve the
/// archive when requested, then tag the commit.
///
/// `vcs_parent` is an already resolved upstream VCS commit recorded as an
/// additional parent.
pub fn commit_upstream<R: Repository + ?Sized>(
    repo: &R,
    session: &mut ImportSession,
    config: &ImportOrigConfig,
    vcs_parent: Option<&str>,
) -> Result<()> {
    let origin = session.artifact.original_path.clone();
    let tree = session.artifact.unpacked.clone().ok_or_else(|| {
        ImportOrigError::import(&origin, "artifact has not been unpacked")
    })?;

    info!(
        "Importing '{}' to branch '{}'{}...",
        origin.display(),
        session.upstream_branch,
        filter_note(&config.filters)
    );
    info!("Source package is {}", session.name);
    info!("Upstream version is {}", session.version);

    let message = expand_version(&config.import_msg, &session.version);
    let parents: Vec<String> = vcs_parent.map(str::to_string).into_iter().collect();
    let commit = repo
        .commit_tree(&tree, &message, &session.upstream_branch, &parents, true)
        .map_err(|e| ImportOrigError::import(&origin, e))?;
    session.commit = Some(commit.clone());

    if config.pristine_tar {
        match session.preservable_archive() {
            Some(archive) => repo
                .archive_preserve(&archive, &session.upstream_branch)
                .map_err(|e| ImportOrigError::import(&origin, e))?,
            None => warn!(
                "'{}' not an archive or not linked, skipping pristine-tar",
                origin.display()
            ),
        }
    }

    let tag = version_to_tag(&config.upstream_tag, &session.version, &session.component);
    repo.create_tag(
        &tag,
        &format!("Upstream version {}", session.version),
        &commit,
        config.sign_tags,
        config.keyid.as_deref(),
    )
    .map_err(|e| ImportOrigError::import(&origin, e))?;
    session.tag = Some(tag);
    Ok(())
}

fn filter_note(filters: &[String]) -> String {
    if filters.is_empty() {
        String::new()
    } else {
        format!(" (filtering out {})", filters.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::identity::Identity;
    use crate::link::ArchiveLink;
    use crate::testing::FakeRepository;
    use std::fs;
    use std::path::Path;

    fn unpacked_session(archive: &Path, tree: &Path, component: &str) -> ImportSession {
        let mut artifact = Artifact::new(archive);
        artifact.unpacked = Some(tree.to_path_buf());
        ImportSession::new(
            artifact,
            Identity {
                name: "foo".into(),
                version: "1.0~rc1".into(),
                component: component.into(),
            },
            debsrc_core::component_branch("upstream", component),
        )
    }

    #[test]
    fn test_filter_note_lists_patterns() {
        assert_eq!(filter_note(&[]), "");
        assert_eq!(
            filter_note(&["*.pyc".to_string(), "debian".to_string()]),
            " (filtering out *.pyc, debian)"
        );
    }

    #[test]
    fn test_commit_and_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir(&tree).unwrap();
        fs::write(tree.join("a"), "a").unwrap();
        let repo = FakeRepository::new(tmp.path());

        let mut session = unpacked_session(&tmp.path().join("foo-1.0.tar.gz"), &tree, "");
        commit_upstream(&repo, &mut session, &ImportOrigConfig::default(), None).unwrap();

        let commit = session.commit.clone().unwrap();
        assert_eq!(session.tag.as_deref(), Some("upstream/1.0_rc1"));
        assert_eq!(repo.branch_tip("upstream"), Some(commit.clone()));
        assert_eq!(repo.tag_target("upstream/1.0_rc1"), Some(commit.clone()));
        let recorded = repo.commit(&commit).unwrap();
        assert_eq!(recorded.message, "Imported Upstream version 1.0~rc1");
        assert!(recorded.parents.is_empty());
        assert_eq!(recorded.files, vec!["a".to_string()]);
    }

    #[test]
    fn test_component_and_vcs_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir(&tree).unwrap();
        let repo = FakeRepository::new(tmp.path());
        let vcs = repo.seed_commit("vendor");

        let mut session = unpacked_session(&tmp.path().join("x.tar.gz"), &tree, "docs");
        commit_upstream(&repo, &mut session, &ImportOrigConfig::default(), Some(&vcs)).unwrap();

        assert_eq!(session.tag.as_deref(), Some("upstream-docs/1.0_rc1"));
        let commit = repo.commit(session.commit.as_deref().unwrap()).unwrap();
        assert_eq!(commit.branch, "upstream-docs");
        assert_eq!(commit.parents, vec![vcs]);
    }

    #[test]
    fn test_preserve_archive_or_warn_for_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("foo-1.0");
        fs::create_dir(&tree).unwrap();
        let repo = FakeRepository::new(tmp.path());
        let config = ImportOrigConfig {
            pristine_tar: true,
            ..Default::default()
        };

        let archive = tmp.path().join("foo_1.0.orig.tar.gz");
        let mut session = unpacked_session(&archive, &tree, "");
        session.archive_link = Some(ArchiveLink {
            path: archive.clone(),
            created: false,
        });
        commit_upstream(&repo, &mut session, &config, None).unwrap();
        assert_eq!(repo.preserved(), vec![(archive, "upstream".to_string())]);

        // A directory import has no archive to preserve.
        let mut session = unpacked_session(&tree, &tree, "");
        session.version = "1.1".into();
        commit_upstream(&repo, &mut session, &config, None).unwrap();
        assert_eq!(repo.preserved().len(), 1);
    }

    #[test]
    fn test_commit_failure_leaves_no_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir(&tree).unwrap();
        let repo = FakeRepository::new(tmp.path());
        repo.fail_commits_on("upstream");

        let mut session = unpacked_session(&tmp.path().join("foo-1.0.tar.gz"), &tree, "");
        let err =
            commit_upstream(&repo, &mut session, &ImportOrigConfig::default(), None).unwrap_err();
        assert!(matches!(err, ImportOrigError::Import { .. }));
        assert_eq!(session.commit, None);
        assert_eq!(session.tag, None);
        assert!(repo.tags().is_empty());
    }
}
