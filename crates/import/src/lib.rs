//! Import upstream release archives into a packaging repository.
//!
//! A run resolves each artifact's package identity, unpacks it next to the
//! repository, commits the tree onto an upstream branch, tags it and merges
//! the tag into the packaging branch. See [`Importer::run`].

pub mod artifact;
pub mod commit;
pub mod error;
pub mod hook;
pub mod identity;
pub mod importer;
pub mod integrate;
pub mod link;
pub mod normalize;
pub mod session;
pub mod source;
pub mod unpack;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use artifact::Artifact;
pub use error::{ImportOrigError, Result};
pub use identity::{Identity, IdentityResolver, NoPrompt, Prompter};
pub use importer::{ImportRequest, Importer};
pub use session::{ImportOrigOutcome, ImportSession, ImportedComponent};
pub use source::{find_artifacts, ArtifactSource, UpdateChecker, Uscan, UscanReport};
