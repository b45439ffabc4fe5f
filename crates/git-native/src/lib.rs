pub mod error;
pub mod git;
pub mod ops;
pub mod repository;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{RepoError, Result};
pub use git::{GitRepository, PRISTINE_TAR};
pub use repository::{MergeOutcome, Repository};
