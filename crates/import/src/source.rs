//! Where the artifacts to import come from: the command line or `uscan`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::error::{ImportOrigError, Result};

static DEHS_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?P<tag>[a-z-]+)>(?P<value>[^<]*)</[a-z-]+>").unwrap());

/// Parsed `uscan --dehs` report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UscanReport {
    pub status: Option<String>,
    pub target: Option<String>,
    pub target_path: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl UscanReport {
    pub fn parse(dehs: &str) -> Self {
        let mut report = Self::default();
        for caps in DEHS_FIELD_RE.captures_iter(dehs) {
            let value = caps["value"].trim().to_string();
            match &caps["tag"] {
                "status" => report.status = Some(value),
                "target" => report.target = Some(value),
                "target-path" => report.target_path = Some(value),
                "warnings" => report.warnings.push(value),
                "errors" => report.errors.push(value),
                _ => {}
            }
        }
        report
    }

    pub fn is_up_to_date(&self) -> bool {
        self.status.as_deref() == Some("up to date")
    }

    /// Downloaded tarball. A relative `target-path` is relative to `dir`,
    /// `target` to its parent.
    pub fn tarball(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(path) = &self.target_path {
            return Some(dir.join(path));
        }
        let parent = dir.parent().unwrap_or(dir);
        self.target.as_ref().map(|t| parent.join(t))
    }
}

/// Checks for and downloads new upstream releases.
pub trait UpdateChecker {
    fn check(&self, dir: &Path) -> Result<UscanReport>;
}

/// Runs `uscan --symlink --destdir=.. --dehs` in the package directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uscan;

impl UpdateChecker for Uscan {
    fn check(&self, dir: &Path) -> Result<UscanReport> {
        info!("Launching uscan...");
        let output = Command::new("uscan")
            .args(["--symlink", "--destdir=..", "--dehs"])
            .current_dir(dir)
            .output()
            .map_err(|e| ImportOrigError::Source(format!("failed to run uscan: {e}")))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            return Err(ImportOrigError::Source(format!(
                "uscan exited abnormally: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(UscanReport::parse(&stdout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Paths(Vec<PathBuf>),
    /// Nothing new upstream.
    UpToDate,
}

/// Pick the artifacts to import.
///
/// `checker` is set when the user asked to look for a new upstream release.
pub fn find_artifacts(
    paths: Vec<PathBuf>,
    checker: Option<&dyn UpdateChecker>,
    dir: &Path,
) -> Result<ArtifactSource> {
    let Some(checker) = checker else {
        if paths.is_empty() {
            return Err(ImportOrigError::NoArtifacts);
        }
        return Ok(ArtifactSource::Paths(paths));
    };

    if !paths.is_empty() {
        return Err(ImportOrigError::Source(
            "you can't pass both --uscan and a filename".into(),
        ));
    }
    let report = checker.check(dir)?;
    for warning in &report.warnings {
        warn!("uscan: {}", warning);
    }
    if !report.errors.is_empty() {
        return Err(ImportOrigError::Source(report.errors.join("; ")));
    }
    if report.is_up_to_date() {
        info!("package is up to date, nothing to do.");
        return Ok(ArtifactSource::UpToDate);
    }
    match report.tarball(dir) {
        Some(tarball) => {
            info!("Using uscan downloaded tarball {}", tarball.display());
            Ok(ArtifactSource::Paths(vec![tarball]))
        }
        None => Err(ImportOrigError::Source(
            "uscan didn't download anything, and no tarball was found in ../".into(),
        )),
    }
}
