use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository: {0}")]
    NotARepo(PathBuf),

    #[error("git error: {0}")]
    Gix(Box<dyn std::error::Error + Send + Sync>),

    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("tag '{name}' already exists and points to {existing}")]
    TagExists { name: String, existing: String },

    #[error("invalid tree path {path}: {reason}")]
    InvalidTree { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepoError>;
