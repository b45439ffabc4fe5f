use std::path::PathBuf;

use tempfile::TempDir;
use tracing::warn;

use crate::artifact::Artifact;
use crate::identity::Identity;
use crate::link::ArchiveLink;

/// Per-artifact state carried through an import run.
#[derive(Debug)]
pub struct ImportSession {
    pub artifact: Artifact,
    pub name: String,
    pub version: String,
    pub component: String,
    pub upstream_branch: String,
    pub archive_link: Option<ArchiveLink>,
    /// Set once the upstream commit exists.
    pub commit: Option<String>,
    pub tag: Option<String>,
    temp_dirs: Vec<TempDir>,
}

impl ImportSession {
    pub fn new(artifact: Artifact, identity: Identity, upstream_branch: String) -> Self {
        Self {
            artifact,
            name: identity.name,
            version: identity.version,
            component: identity.component,
            upstream_branch,
            archive_link: None,
            commit: None,
            tag: None,
            temp_dirs: Vec::new(),
        }
    }

    pub(crate) fn track_temp_dir(&mut self, dir: TempDir) {
        self.temp_dirs.push(dir);
    }

    pub fn temp_dir_paths(&self) -> Vec<PathBuf> {
        self.temp_dirs.iter().map(|d| d.path().to_path_buf()).collect()
    }

    /// Archive to hand to the preservation tool: the canonically named
    /// archive, absent for directories and when linking failed.
    pub fn preservable_archive(&self) -> Option<PathBuf> {
        self.archive_link.as_ref().map(|link| link.path.clone())
    }

    /// Remove temporary directories, and the archive link unless it is kept.
    ///
    /// Failures are logged; cleanup never fails the run.
    pub(crate) fn cleanup(&mut self, keep_link: bool) {
        if let Some(link) = self.archive_link.take() {
            if link.created && !keep_link {
                if let Err(e) = std::fs::remove_file(&link.path) {
                    warn!(path = %link.path.display(), "Failed to remove archive link: {e}");
                }
            }
        }
        for dir in self.temp_dirs.drain(..) {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), "Failed to remove temporary directory: {e}");
            }
        }
    }
}

/// One imported component as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedComponent {
    /// Empty for the main tarball.
    pub component: String,
    pub branch: String,
    pub commit: String,
    pub tag: String,
}

/// Summary of a successful import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOrigOutcome {
    pub name: String,
    pub version: String,
    pub imported: Vec<ImportedComponent>,
    /// Branches the upstream tags were merged into, in order.
    pub merged_into: Vec<String>,
    pub postimport_ran: bool,
}
