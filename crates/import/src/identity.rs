//! Determine the package name, upstream version and component of an artifact.

use std::io;

use debsrc_core::{
    is_valid_package_name, is_valid_upstream_version, ChangelogHeader, CHANGELOG_PATH,
    PACKAGE_NAME_MSG, UPSTREAM_VERSION_MSG,
};
use debsrc_git_native::Repository;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::error::{ImportOrigError, Result};

/// Asks the user for a value.
///
/// Implementations re-ask until `validate` accepts the answer, showing
/// `invalid_msg` in between.
pub trait Prompter {
    fn ask(
        &self,
        question: &str,
        default: Option<&str>,
        validate: &dyn Fn(&str) -> bool,
        invalid_msg: &str,
    ) -> io::Result<String>;
}

/// Prompter for non-interactive runs; every question fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(
        &self,
        question: &str,
        _default: Option<&str>,
        _validate: &dyn Fn(&str) -> bool,
        _invalid_msg: &str,
    ) -> io::Result<String> {
        Err(io::Error::other(format!(
            "cannot ask '{question}' without a terminal"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub version: String,
    pub component: String,
}

pub struct IdentityResolver<'a, R: Repository + ?Sized> {
    repo: &'a R,
    prompter: &'a dyn Prompter,
    debian_branch: &'a str,
    interactive: bool,
    explicit_version: Option<&'a str>,
}

impl<'a, R: Repository + ?Sized> IdentityResolver<'a, R> {
    pub fn new(
        repo: &'a R,
        prompter: &'a dyn Prompter,
        debian_branch: &'a str,
        interactive: bool,
    ) -> Self {
        Self {
            repo,
            prompter,
            debian_branch,
            interactive,
            explicit_version: None,
        }
    }

    pub fn with_version(mut self, version: Option<&'a str>) -> Self {
        self.explicit_version = version;
        self
    }

    pub fn resolve(&self, artifact: &Artifact) -> Result<Identity> {
        let name = self.resolve_name(artifact)?;
        let version = self.resolve_version(artifact)?;
        Ok(Identity {
            name,
            version,
            component: artifact.component.clone(),
        })
    }

    /// Packaging metadata in the worktree, then on the debian branch, then
    /// the user (defaulting to the guess), then the artifact name.
    fn resolve_name(&self, artifact: &Artifact) -> Result<String> {
        if let Some(header) = self.packaging_header() {
            return Ok(header.source);
        }
        let guess = artifact.detected_name.as_deref();
        if self.interactive {
            return self
                .ask(
                    "What will be the source package name?",
                    guess,
                    &is_valid_package_name,
                    PACKAGE_NAME_MSG,
                )
                .map_err(|e| ImportOrigError::Identity(format!("couldn't read package name: {e}")));
        }
        if let Some(name) = guess {
            debug!(name, "Package name guessed from artifact");
            return Ok(name.to_string());
        }
        Err(ImportOrigError::Identity(
            "Couldn't determine upstream package name. Use --interactive.".into(),
        ))
    }

    /// Explicit version, then the user (defaulting to the guess), then the
    /// artifact name.
    fn resolve_version(&self, artifact: &Artifact) -> Result<String> {
        if let Some(version) = self.explicit_version {
            return Ok(version.to_string());
        }
        let guess = artifact.detected_version.as_deref();
        if self.interactive {
            return self
                .ask(
                    "What is the upstream version?",
                    guess,
                    &is_valid_upstream_version,
                    UPSTREAM_VERSION_MSG,
                )
                .map_err(|e| ImportOrigError::Identity(format!("couldn't read version: {e}")));
        }
        guess.map(str::to_string).ok_or_else(|| {
            ImportOrigError::Identity(
                "Couldn't determine upstream version. Use '-u<version>' or --interactive.".into(),
            )
        })
    }

    fn ask(
        &self,
        question: &str,
        default: Option<&str>,
        validate: &dyn Fn(&str) -> bool,
        invalid_msg: &str,
    ) -> io::Result<String> {
        self.prompter.ask(question, default, validate, invalid_msg)
    }

    fn packaging_header(&self) -> Option<ChangelogHeader> {
        let worktree = self.repo.path().join(CHANGELOG_PATH);
        if let Ok(content) = std::fs::read_to_string(&worktree) {
            match ChangelogHeader::parse(&content) {
                Ok(header) => return Some(header),
                Err(e) => warn!(path = %worktree.display(), "Ignoring changelog: {e}"),
            }
        }

        match self.repo.read_file_at(self.debian_branch, CHANGELOG_PATH) {
            Ok(Some(bytes)) => match ChangelogHeader::parse(&String::from_utf8_lossy(&bytes)) {
                Ok(header) => Some(header),
                Err(e) => {
                    warn!(branch = %self.debian_branch, "Ignoring changelog: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(branch = %self.debian_branch, "Cannot read changelog from branch: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRepository, ScriptedPrompter};

    const CHANGELOG: &[u8] = b"pkg (2:0.9-1) unstable; urgency=low\n\n  * x\n";

    #[test]
    fn test_worktree_changelog_wins() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("debian")).unwrap();
        std::fs::write(tmp.path().join(CHANGELOG_PATH), CHANGELOG).unwrap();
        let repo = FakeRepository::new(tmp.path());
        repo.add_file("debian", CHANGELOG_PATH, b"other (1.0-1) unstable; urgency=low\n");

        let resolver = IdentityResolver::new(&repo, &NoPrompt, "debian", false);
        let id = resolver.resolve(&Artifact::new("/x/foo-1.0.tar.gz")).unwrap();
        assert_eq!(id.name, "pkg");
        assert_eq!(id.version, "1.0");
    }

    #[test]
    fn test_branch_changelog_used_when_worktree_lacks_one() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        repo.add_file("debian", CHANGELOG_PATH, b"other (1.0-1) unstable; urgency=low\n");

        let resolver = IdentityResolver::new(&repo, &NoPrompt, "debian", false);
        let id = resolver.resolve(&Artifact::new("/x/foo-1.0.tar.gz")).unwrap();
        assert_eq!(id.name, "other");
    }

    #[test]
    fn test_guess_and_explicit_version() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());

        let resolver =
            IdentityResolver::new(&repo, &NoPrompt, "debian", false).with_version(Some("2.0~rc1"));
        let id = resolver
            .resolve(&Artifact::new("/x/foo_1.0.orig-docs.tar.gz"))
            .unwrap();
        assert_eq!(
            id,
            Identity {
                name: "foo".into(),
                version: "2.0~rc1".into(),
                component: "docs".into(),
            }
        );
    }

    #[test]
    fn test_non_interactive_without_name_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());

        let resolver = IdentityResolver::new(&repo, &NoPrompt, "debian", false);
        let err = resolver.resolve(&Artifact::new("/x/snapshot.tar.gz")).unwrap_err();
        assert!(matches!(err, ImportOrigError::Identity(ref m) if m.contains("--interactive")));
    }

    #[test]
    fn test_non_interactive_without_version_fails() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("debian")).unwrap();
        std::fs::write(tmp.path().join(CHANGELOG_PATH), CHANGELOG).unwrap();
        let repo = FakeRepository::new(tmp.path());

        let resolver = IdentityResolver::new(&repo, &NoPrompt, "debian", false);
        let err = resolver.resolve(&Artifact::new("/x/snapshot.tar.gz")).unwrap_err();
        assert!(matches!(err, ImportOrigError::Identity(ref m) if m.contains("version")));
    }

    #[test]
    fn test_interactive_prompts_and_revalidates() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        let prompter = ScriptedPrompter::new(["Bad Name", "good-name", "v1", "1.5"]);

        let resolver = IdentityResolver::new(&repo, &prompter, "debian", true);
        let id = resolver.resolve(&Artifact::new("/x/snapshot.tar.gz")).unwrap();
        assert_eq!(id.name, "good-name");
        assert_eq!(id.version, "1.5");
        assert_eq!(prompter.asked().len(), 2);
    }

    #[test]
    fn test_interactive_version_defaults_to_guess() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        let prompter = ScriptedPrompter::new(["", ""]);

        let resolver = IdentityResolver::new(&repo, &prompter, "debian", true);
        let id = resolver.resolve(&Artifact::new("/x/foo-1.0.tar.gz")).unwrap();
        assert_eq!(id.name, "foo");
        assert_eq!(id.version, "1.0");
        assert_eq!(
            prompter.asked(),
            vec![
                "What will be the source package name?".to_string(),
                "What is the upstream version?".to_string(),
            ]
        );
    }

    #[test]
    fn test_interactive_name_overrides_guess() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = FakeRepository::new(tmp.path());
        let prompter = ScriptedPrompter::new(["libfoo", ""]);

        let resolver = IdentityResolver::new(&repo, &prompter, "debian", true);
        let id = resolver.resolve(&Artifact::new("/x/foo-1.0.tar.gz")).unwrap();
        assert_eq!(id.name, "libfoo");
        assert_eq!(id.version, "1.0");
    }

    #[test]
    fn test_interactive_skips_name_prompt_with_changelog() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("debian")).unwrap();
        std::fs::write(tmp.path().join(CHANGELOG_PATH), CHANGELOG).unwrap();
        let repo = FakeRepository::new(tmp.path());
        let prompter = ScriptedPrompter::new([""]);

        let resolver = IdentityResolver::new(&repo, &prompter, "debian", true);
        let id = resolver.resolve(&Artifact::new("/x/foo-1.0.tar.gz")).unwrap();
        assert_eq!(id.name, "pkg");
        assert_eq!(prompter.asked(), vec!["What is the upstream version?".to_string()]);
    }
}
