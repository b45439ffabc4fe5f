pub mod archive;
pub mod changelog;
pub mod policy;
pub mod template;

pub use archive::{orig_link_extension, parse_archive_filename, ArchiveFormat, ArchiveName, Compression};
pub use changelog::ChangelogHeader;
pub use policy::{
    component_branch, guess_upstream_source, is_valid_package_name, is_valid_upstream_version,
    orig_tarball_name, UpstreamGuess, PACKAGE_NAME_MSG, UPSTREAM_VERSION_MSG,
};
pub use template::{expand_version, sanitize_version_for_tag, version_to_tag};

/// Path of the changelog inside a debianized tree.
pub const CHANGELOG_PATH: &str = "debian/changelog";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("changelog is empty")]
    EmptyChangelog,
    #[error("malformed changelog header: {0}")]
    MalformedChangelogHeader(String),
}
