use std::path::PathBuf;

use debsrc_git_native::RepoError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImportOrigError {
    /// Package name or version could not be determined.
    #[error("{0}")]
    Identity(String),

    #[error("failed to unpack '{path}': {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("the upstream tree '{path}' contains git metadata at '{marker}' - giving up")]
    ForeignVcsMetadata { path: PathBuf, marker: PathBuf },

    #[error("cannot symlink '{artifact}' to '{link}': {reason}")]
    Link {
        artifact: PathBuf,
        link: PathBuf,
        reason: String,
    },

    #[error("import of '{path}' failed: {reason}")]
    Import { path: PathBuf, reason: String },

    #[error("merge of '{tag}' into '{branch}' failed, please resolve ({})", .paths.join(", "))]
    MergeConflict {
        tag: String,
        branch: String,
        paths: Vec<String>,
    },

    #[error("duplicate component '{component}' (both resolve to branch '{branch}')")]
    DuplicateComponent { component: String, branch: String },

    #[error("{0} is not a git repository")]
    NotARepository(PathBuf),

    #[error("repository has uncommitted changes, commit these first:\n{0}")]
    UncommittedChanges(String),

    #[error(
        "repository does not have branch '{0}' for upstream sources; create it first or use \
         --upstream-branch to specify it"
    )]
    MissingUpstreamBranch(String),

    #[error("invalid filter pattern: {0}")]
    InvalidFilter(String),

    #[error("no archive to import specified")]
    NoArtifacts,

    #[error("update check failed: {0}")]
    Source(String),

    #[error("post-import command failed: {0}")]
    Hook(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepoError),
}

impl ImportOrigError {
    /// Whether the user can fix this by changing input or flags and retrying.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::Identity(_)
                | Self::Extraction { .. }
                | Self::NotARepository(_)
                | Self::UncommittedChanges(_)
                | Self::MissingUpstreamBranch(_)
                | Self::NoArtifacts
                | Self::InvalidFilter(_)
                | Self::DuplicateComponent { .. }
        )
    }

    pub(crate) fn import(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Import {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportOrigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_conflict_message_lists_paths() {
        let err = ImportOrigError::MergeConflict {
            tag: "upstream/1.0".into(),
            branch: "debian".into(),
            paths: vec!["a.c".into(), "b.c".into()],
        };
        assert_eq!(
            err.to_string(),
            "merge of 'upstream/1.0' into 'debian' failed, please resolve (a.c, b.c)"
        );
        assert!(!err.is_user_correctable());
    }

    #[test]
    fn test_classification() {
        assert!(ImportOrigError::Identity("x".into()).is_user_correctable());
        assert!(ImportOrigError::NoArtifacts.is_user_correctable());
        assert!(
            !ImportOrigError::ForeignVcsMetadata {
                path: "a".into(),
                marker: "a/.git".into()
            }
            .is_user_correctable()
        );
        assert!(!ImportOrigError::Hook("exit 1".into()).is_user_correctable());
    }
}
