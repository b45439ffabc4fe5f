//! Post-import hook.

use std::path::Path;
use std::process::Command;

use debsrc_core::{expand_version, ChangelogHeader, CHANGELOG_PATH};
use tracing::{debug, info};

use crate::error::{ImportOrigError, Result};

/// Environment variable naming the packaging branch the hook runs on.
pub const BRANCH_ENV: &str = "DEBSRC_BRANCH";

/// Debian version a freshly imported upstream version will be packaged as:
/// `[<epoch>:]<upstream>-1`, with the epoch taken from the current changelog.
pub fn new_package_version(worktree: &Path, upstream_version: &str) -> String {
    let epoch = std::fs::read_to_string(worktree.join(CHANGELOG_PATH))
        .ok()
        .and_then(|content| ChangelogHeader::parse(&content).ok())
        .and_then(|header| header.epoch().map(str::to_string));
    match epoch {
        Some(epoch) => format!("{epoch}:{upstream_version}-1"),
        None => format!("{upstream_version}-1"),
    }
}

/// Run `template` through `sh -c` in `worktree` with `%(version)s` expanded
/// to the new package version.
pub fn run_postimport(
    worktree: &Path,
    template: &str,
    branch: &str,
    upstream_version: &str,
) -> Result<()> {
    let version = new_package_version(worktree, upstream_version);
    let command = expand_version(template, &version);
    info!("Running post-import hook: {}", command);

    let output = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .current_dir(worktree)
        .env(BRANCH_ENV, branch)
        .output()
        .map_err(|e| ImportOrigError::Hook(format!("failed to run '{command}': {e}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("{}", stdout.trim_end());
    }
    if !output.status.success() {
        return Err(ImportOrigError::Hook(format!(
            "'{command}' exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
