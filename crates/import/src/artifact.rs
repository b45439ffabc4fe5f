use std::path::{Path, PathBuf};

use debsrc_core::{guess_upstream_source, parse_archive_filename, ArchiveFormat};

/// One upstream source handed to the importer: an archive or a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Archive preserved alongside the import. Replaced by the repacked
    /// archive when filters must apply to the preserved copy.
    pub path: PathBuf,
    /// Path as given on the command line.
    pub original_path: PathBuf,
    pub is_dir: bool,
    /// Root of the unpacked tree once normalized.
    pub unpacked: Option<PathBuf>,
    /// Empty for the main tarball.
    pub component: String,
    pub detected_name: Option<String>,
    pub detected_version: Option<String>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_dir = path.is_dir();
        let guess = basename_of(&path).and_then(|name| guess_upstream_source(&name, is_dir));
        let (detected_name, detected_version, component) = match guess {
            Some(g) => (Some(g.package), Some(g.version), g.component),
            None => (None, None, String::new()),
        };
        Self {
            original_path: path.clone(),
            path,
            is_dir,
            unpacked: None,
            component,
            detected_name,
            detected_version,
        }
    }

    pub fn basename(&self) -> String {
        basename_of(&self.path).unwrap_or_default()
    }

    /// Archive format of the current path, `None` for directories and
    /// unrecognized files.
    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        if self.is_dir {
            return None;
        }
        parse_archive_filename(&self.basename()).format
    }
}

fn basename_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
