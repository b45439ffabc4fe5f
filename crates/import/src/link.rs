//! Canonical `.orig` names for imported archives.

use std::fs;
use std::path::{Path, PathBuf};

use debsrc_core::{orig_link_extension, orig_tarball_name};
use tracing::{debug, info};

use crate::error::{ImportOrigError, Result};

/// Canonical name of the archive after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLink {
    pub path: PathBuf,
    /// Whether this run created the symlink and so owns it.
    pub created: bool,
}

/// `<name>_<version>.orig[-<component>].tar<ext>` for `archive`.
pub fn canonical_orig_name(archive: &Path, name: &str, version: &str, component: &str) -> String {
    let filename = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    orig_tarball_name(name, version, component, &orig_link_extension(&filename))
}

/// Make `archive` available as `canonical` inside `dir`.
///
/// Nothing happens when the archive already has that name or a link of that
/// name already points at it.
pub fn link_to_canonical(archive: &Path, dir: &Path, canonical: &str) -> Result<ArchiveLink> {
    if archive.file_name().is_some_and(|n| n == canonical) {
        return Ok(ArchiveLink {
            path: archive.to_path_buf(),
            created: false,
        });
    }

    let link = dir.join(canonical);
    if is_link_target(archive, &link) {
        debug!(link = %link.display(), "Archive link already in place");
        return Ok(ArchiveLink {
            path: link,
            created: false,
        });
    }

    let target = std::path::absolute(archive).map_err(|e| link_error(archive, &link, e))?;
    symlink(&target, &link).map_err(|e| link_error(archive, &link, e))?;
    info!("Linked '{}' to '{}'", link.display(), target.display());
    Ok(ArchiveLink {
        path: link,
        created: true,
    })
}

fn is_link_target(archive: &Path, link: &Path) -> bool {
    let is_symlink = fs::symlink_metadata(link)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_symlink {
        return false;
    }
    match (fs::canonicalize(link), fs::canonicalize(archive)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn link_error(archive: &Path, link: &Path, err: std::io::Error) -> ImportOrigError {
    ImportOrigError::Link {
        artifact: archive.to_path_buf(),
        link: link.to_path_buf(),
        reason: err.to_string(),
    }
}
